//! Entry point of the aggregation pipeline

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{DetailResolver, ResultProjector, TopIdCacheLoader};
use crate::cache::CacheManager;
use crate::config::Settings;
use crate::data::{ItemDetail, ListingSource};

/// Serves pages of top stories
///
/// Holds no request state of its own; all sharing between requests goes
/// through the `CacheManager` handed in at construction.
#[derive(Clone)]
pub struct AggregationService {
    top_ids: TopIdCacheLoader,
    resolver: DetailResolver,
    projector: ResultProjector,
    max_stories: usize,
}

impl AggregationService {
    pub fn new(source: Arc<dyn ListingSource>, cache: CacheManager, settings: &Settings) -> Self {
        Self {
            top_ids: TopIdCacheLoader::new(
                Arc::clone(&source),
                cache.clone(),
                settings.cache_settings.ranked_list_policy(),
            ),
            resolver: DetailResolver::new(source, cache, settings),
            projector: ResultProjector::new(),
            max_stories: settings.api_settings.max_stories,
        }
    }

    /// Returns page `page_number` of the top stories whose title matches
    /// `query`
    ///
    /// `page_number` and `page_size` must be positive; callers validate them.
    pub async fn get_top_stories(
        &self,
        page_number: usize,
        page_size: usize,
        query: &str,
    ) -> Vec<ItemDetail> {
        self.get_top_stories_until(page_number, page_size, query, &CancellationToken::new())
            .await
    }

    /// Like [`AggregationService::get_top_stories`], abandoning outstanding
    /// item fetches when `cancel` fires
    pub async fn get_top_stories_until(
        &self,
        page_number: usize,
        page_size: usize,
        query: &str,
        cancel: &CancellationToken,
    ) -> Vec<ItemDetail> {
        let ids = self.top_ids.get_top_ids().await;
        if ids.is_empty() {
            info!("no ranked ids available");
            return Vec::new();
        }

        let items = self.resolver.resolve_until(&ids, self.max_stories, cancel).await;
        let resolved = items.len();
        let page = self.projector.project(items, page_number, page_size, query);

        info!(
            ranked = ids.len(),
            resolved,
            page_number,
            page_size,
            returned = page.len(),
            "served top stories"
        );
        page
    }
}
