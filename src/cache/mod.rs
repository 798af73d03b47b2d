//! In-memory caching for upstream responses
//!
//! This module provides an explicitly constructed, shareable cache with
//! per-entry absolute and sliding expiration, and a registry of in-flight
//! fetches so that concurrent misses on one key share a single upstream call.

mod flight;
mod manager;

pub use flight::{Flight, InFlight};
pub use manager::{story_key, CacheManager, CachedValue, EntryPolicy, TOP_STORIES_KEY};
