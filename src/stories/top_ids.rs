//! Cache-aside loader for the ranked id list

use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheManager, CachedValue, EntryPolicy, InFlight, TOP_STORIES_KEY};
use crate::data::{ItemId, ListingSource};

type RankedIds = Arc<Vec<ItemId>>;

/// Produces the current ranking, served from the cache when possible
///
/// The whole list is one cache entry under [`TOP_STORIES_KEY`], written with
/// both an absolute and a sliding lifetime. An empty upstream answer is
/// returned as-is and never cached, so the next call asks the upstream again.
#[derive(Clone)]
pub struct TopIdCacheLoader {
    source: Arc<dyn ListingSource>,
    cache: CacheManager,
    policy: EntryPolicy,
    in_flight: InFlight<&'static str, RankedIds>,
}

impl TopIdCacheLoader {
    pub fn new(source: Arc<dyn ListingSource>, cache: CacheManager, policy: EntryPolicy) -> Self {
        Self {
            source,
            cache,
            policy,
            in_flight: InFlight::new(),
        }
    }

    /// Returns the ranked ids in upstream order
    pub async fn get_top_ids(&self) -> RankedIds {
        if let Some(ids) = self.cached() {
            debug!(count = ids.len(), "ranked ids cache hit");
            return ids;
        }

        let flight = self.in_flight.join_or_start(
            TOP_STORIES_KEY,
            || self.cached(),
            || {
                let source = Arc::clone(&self.source);
                let cache = self.cache.clone();
                let in_flight = self.in_flight.clone();
                let policy = self.policy;
                async move {
                    let ids = Arc::new(source.fetch_ranked_ids().await);
                    if ids.is_empty() {
                        warn!("upstream returned no ranked ids");
                    } else {
                        debug!(count = ids.len(), "caching ranked ids");
                        let value = CachedValue::RankedIds(Arc::clone(&ids));
                        cache.insert(TOP_STORIES_KEY, value, policy);
                    }
                    in_flight.finish(&TOP_STORIES_KEY);
                    ids
                }
                .boxed()
            },
        );
        flight.await
    }

    fn cached(&self) -> Option<RankedIds> {
        match self.cache.get(TOP_STORIES_KEY) {
            Some(CachedValue::RankedIds(ids)) => Some(ids),
            _ => None,
        }
    }
}
