//! Cache manager holding upstream responses in memory
//!
//! Provides a `CacheManager` backed by `moka` where every entry carries its
//! own expiration policy: a fixed lifetime from write, optionally shortened
//! to a sliding window that is renewed on each read.

use moka::sync::Cache;
use moka::Expiry;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::data::{ItemDetail, ItemId};

/// Cache key of the ranked id list
pub const TOP_STORIES_KEY: &str = "TopStories";

/// Returns the cache key of an item's detail record
pub fn story_key(id: ItemId) -> String {
    format!("Story_{}", id)
}

/// Expiration policy attached to a single cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPolicy {
    /// Lifetime measured from the write, never extended
    pub absolute: Duration,
    /// Idle window renewed by every read, capped by `absolute`
    pub sliding: Option<Duration>,
}

impl EntryPolicy {
    /// Policy that expires `ttl` after the write regardless of reads
    pub fn absolute(ttl: Duration) -> Self {
        Self {
            absolute: ttl,
            sliding: None,
        }
    }

    /// Policy that expires after `sliding` without reads, or `absolute` after
    /// the write, whichever comes first
    pub fn sliding(absolute: Duration, sliding: Duration) -> Self {
        Self {
            absolute,
            sliding: Some(sliding),
        }
    }

    fn ttl_on_write(&self) -> Duration {
        match self.sliding {
            Some(sliding) => sliding.min(self.absolute),
            None => self.absolute,
        }
    }

    /// Remaining life after a read at `age` past the write, if reads renew it
    fn ttl_on_read(&self, age: Duration) -> Option<Duration> {
        let remaining = self.absolute.saturating_sub(age);
        self.sliding.map(|sliding| sliding.min(remaining))
    }
}

/// Values the cache can hold
#[derive(Debug, Clone)]
pub enum CachedValue {
    /// The ranked id list, in upstream order
    RankedIds(Arc<Vec<ItemId>>),
    /// One item's detail record, valid or not
    Item(Arc<ItemDetail>),
}

#[derive(Clone)]
struct Stored {
    value: CachedValue,
    policy: EntryPolicy,
}

/// Reads each entry's own policy
struct PolicyExpiry;

impl Expiry<String, Stored> for PolicyExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        stored: &Stored,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(stored.policy.ttl_on_write())
    }

    fn expire_after_read(
        &self,
        _key: &String,
        stored: &Stored,
        read_at: Instant,
        duration_until_expiry: Option<Duration>,
        last_modified_at: Instant,
    ) -> Option<Duration> {
        let age = read_at.saturating_duration_since(last_modified_at);
        stored.policy.ttl_on_read(age).or(duration_until_expiry)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        stored: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(stored.policy.ttl_on_write())
    }
}

/// Process-wide store of upstream responses
///
/// Cloning yields another handle to the same store. There is no default
/// instance; the owner constructs one at startup and passes it down.
#[derive(Clone)]
pub struct CacheManager {
    entries: Cache<String, Stored>,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl CacheManager {
    /// Creates an empty cache holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PolicyExpiry)
            .build();
        Self { entries }
    }

    /// Reads an entry, renewing its sliding window if it has one
    ///
    /// Returns `None` for missing and expired keys.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        self.entries.get(key).map(|stored| stored.value)
    }

    /// Writes an entry, replacing any previous value and restarting its clock
    pub fn insert(&self, key: impl Into<String>, value: CachedValue, policy: EntryPolicy) {
        self.entries.insert(key.into(), Stored { value, policy });
    }

    /// Returns true if an unexpired entry exists, without renewing it
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live entries after pending maintenance has run
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}
