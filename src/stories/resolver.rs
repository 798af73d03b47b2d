//! Capped, concurrent resolution of item details
//!
//! Ids are visited newest first (descending id). Cached records are used as
//! they are; misses are fetched from the upstream in parallel and every
//! fetched record is cached, valid or not, so dead items are not fetched
//! again until their entry expires.
//!
//! Admission stops once the valid cache hits reach the cap. Fetches already
//! dispatched are still awaited, and the combined list is truncated to the
//! cap at the end.

use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{story_key, CacheManager, CachedValue, EntryPolicy, Flight, InFlight};
use crate::config::Settings;
use crate::data::{ItemDetail, ItemId, ListingSource};

type Detail = Arc<ItemDetail>;

/// Turns ranked ids into at most `cap` valid detail records
#[derive(Clone)]
pub struct DetailResolver {
    source: Arc<dyn ListingSource>,
    cache: CacheManager,
    policy: EntryPolicy,
    in_flight: InFlight<ItemId, Detail>,
    /// Bounds upstream item fetches across all resolve passes
    fetch_permits: Arc<Semaphore>,
    fetch_timeout: Duration,
}

impl DetailResolver {
    pub fn new(source: Arc<dyn ListingSource>, cache: CacheManager, settings: &Settings) -> Self {
        Self {
            source,
            cache,
            policy: settings.cache_settings.detail_policy(),
            in_flight: InFlight::new(),
            fetch_permits: Arc::new(Semaphore::new(settings.api_settings.max_concurrent_fetches)),
            fetch_timeout: settings.api_settings.fetch_timeout(),
        }
    }

    /// Replaces the expiration policy of cached detail records
    pub fn with_policy(mut self, policy: EntryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolves `ids` into at most `cap` valid records
    pub async fn resolve(&self, ids: &[ItemId], cap: usize) -> Vec<ItemDetail> {
        self.resolve_until(ids, cap, &CancellationToken::new()).await
    }

    /// Like [`DetailResolver::resolve`], giving up on outstanding fetches
    /// when `cancel` fires or the fetch timeout elapses
    ///
    /// Fetches that have not finished by then count as invalid for this pass.
    /// They keep running in the background and still cache their result.
    pub async fn resolve_until(
        &self,
        ids: &[ItemId],
        cap: usize,
        cancel: &CancellationToken,
    ) -> Vec<ItemDetail> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));

        let mut valid = Vec::new();
        let mut pending = Vec::new();
        let mut skipped_invalid = 0usize;

        for id in ordered {
            if valid.len() >= cap {
                break;
            }
            match self.cached(id) {
                Some(detail) if detail.is_valid() => valid.push(detail.as_ref().clone()),
                Some(_) => skipped_invalid += 1,
                None => pending.push((id, self.dispatch(id))),
            }
        }

        debug!(
            hits = valid.len(),
            skipped_invalid,
            dispatched = pending.len(),
            cap,
            "resolving item details"
        );

        // No deadline when the timeout reaches past what `Instant` can hold
        let deadline = Instant::now().checked_add(self.fetch_timeout);
        let fetched = join_all(
            pending
                .into_iter()
                .map(|(id, flight)| await_flight(id, flight, deadline, cancel)),
        )
        .await;

        valid.extend(
            fetched
                .into_iter()
                .flatten()
                .filter(|detail| detail.is_valid())
                .map(|detail| detail.as_ref().clone()),
        );
        valid.truncate(cap);
        valid
    }

    fn cached(&self, id: ItemId) -> Option<Detail> {
        match self.cache.get(&story_key(id)) {
            Some(CachedValue::Item(detail)) => Some(detail),
            _ => None,
        }
    }

    /// Joins the pending fetch for `id`, or spawns one
    fn dispatch(&self, id: ItemId) -> Flight<Detail> {
        self.in_flight
            .join_or_start(id, || self.cached(id), || self.spawn_fetch(id))
    }

    /// Spawns the upstream fetch for `id`, caching whatever comes back
    fn spawn_fetch(&self, id: ItemId) -> BoxFuture<'static, Detail> {
        let task = {
            let source = Arc::clone(&self.source);
            let cache = self.cache.clone();
            let in_flight = self.in_flight.clone();
            let permits = Arc::clone(&self.fetch_permits);
            let policy = self.policy;
            tokio::spawn(async move {
                let detail = {
                    let _permit = permits.acquire_owned().await;
                    Arc::new(source.fetch_item(id).await)
                };
                cache.insert(story_key(id), CachedValue::Item(Arc::clone(&detail)), policy);
                in_flight.finish(&id);
                detail
            })
        };

        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();
        let policy = self.policy;
        async move {
            match task.await {
                Ok(detail) => detail,
                Err(e) => {
                    // The task died before caching; cache a placeholder so
                    // a broken id is not retried on every request
                    warn!(%id, error = %e, "item fetch task failed");
                    let detail = Arc::new(ItemDetail::placeholder(id));
                    cache.insert(story_key(id), CachedValue::Item(Arc::clone(&detail)), policy);
                    in_flight.finish(&id);
                    detail
                }
            }
        }
        .boxed()
    }
}

async fn await_flight(
    id: ItemId,
    flight: Flight<Detail>,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> Option<Detail> {
    let arrival = async {
        match deadline {
            Some(deadline) => timeout_at(deadline, flight).await.ok(),
            None => Some(flight.await),
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(%id, "resolve cancelled before item arrived");
            None
        }
        detail = arrival => {
            if detail.is_none() {
                warn!(%id, "item fetch timed out");
            }
            detail
        }
    }
}
