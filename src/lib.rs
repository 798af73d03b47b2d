//! Top Stories library
//!
//! Aggregates the Hacker News top stories ranking into cached, filtered,
//! paginated result pages, printed once or served over HTTP. The binary in
//! `main.rs` is a thin wrapper; the modules are exposed for integration tests
//! and embedding.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod output;
pub mod server;
pub mod stories;

pub use cache::CacheManager;
pub use config::Settings;
pub use data::{ItemDetail, ItemId, ListingSource};
pub use stories::AggregationService;
