//! Registry of in-flight upstream fetches
//!
//! The first caller to miss a key starts the fetch and registers it; every
//! later caller for that key gets a clone of the same pending result instead
//! of issuing its own upstream request. The fetch deregisters itself once it
//! has written its result to the cache.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// A pending fetch result that any number of callers can await
pub type Flight<V> = Shared<BoxFuture<'static, V>>;

/// Per-key map of pending fetches
pub struct InFlight<K, V> {
    flights: Arc<Mutex<HashMap<K, Flight<V>>>>,
}

impl<K, V> Clone for InFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<K, V> Default for InFlight<K, V> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pending fetch for `key`, starting one if there is none
    ///
    /// `cached` is consulted under the registry lock before anything is
    /// started, which closes the window between a flight finishing and a
    /// late caller missing the cache. `start` must eventually call
    /// [`InFlight::finish`] for `key` after the result has been cached.
    pub fn join_or_start<C, S>(&self, key: K, cached: C, start: S) -> Flight<V>
    where
        C: FnOnce() -> Option<V>,
        S: FnOnce() -> BoxFuture<'static, V>,
    {
        let mut flights = self.lock();
        if let Some(flight) = flights.get(&key) {
            return flight.clone();
        }
        if let Some(value) = cached() {
            return futures::future::ready(value).boxed().shared();
        }
        let flight = start().shared();
        flights.insert(key, flight.clone());
        flight
    }

    /// Deregisters the fetch for `key`
    pub fn finish(&self, key: &K) {
        self.lock().remove(key);
    }

    #[cfg(test)]
    fn is_pending(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.lock().len()
    }

    // The map is only touched in short non-async sections, so a poisoned
    // lock still holds a consistent map.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Flight<V>>> {
        self.flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_start() {
        let registry: InFlight<u64, u64> = InFlight::new();
        let starts = Arc::new(AtomicUsize::new(0));

        let mut flights = Vec::new();
        for _ in 0..5 {
            let starts = Arc::clone(&starts);
            let finisher = registry.clone();
            flights.push(registry.join_or_start(7, || None, move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    finisher.finish(&7);
                    49
                }
                .boxed()
            }));
        }

        assert!(registry.is_pending(&7));
        let results = futures::future::join_all(flights).await;

        assert_eq!(results, vec![49; 5]);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cached_value_skips_start() {
        let registry: InFlight<u64, &'static str> = InFlight::new();

        let flight = registry.join_or_start(1, || Some("cached"), || {
            panic!("start must not run when the value is cached")
        });

        assert_eq!(flight.await, "cached");
        assert!(!registry.is_pending(&1));
    }

    #[tokio::test]
    async fn test_finished_key_can_start_again() {
        let registry: InFlight<u64, u64> = InFlight::new();

        let first = registry.join_or_start(3, || None, || async { 1 }.boxed());
        assert_eq!(first.await, 1);
        registry.finish(&3);

        let second = registry.join_or_start(3, || None, || async { 2 }.boxed());
        assert_eq!(second.await, 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_start_separately() {
        let registry: InFlight<u64, u64> = InFlight::new();

        let a = registry.join_or_start(1, || None, || async { 10 }.boxed());
        let b = registry.join_or_start(2, || None, || async { 20 }.boxed());

        assert_eq!(registry.pending_count(), 2);
        assert_eq!((a.await, b.await), (10, 20));
    }
}
