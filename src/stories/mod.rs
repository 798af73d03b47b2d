//! Aggregation pipeline
//!
//! Ranked ids come from `TopIdCacheLoader`, are turned into valid detail
//! records by `DetailResolver`, and are filtered and paged by
//! `ResultProjector`. `AggregationService` wires the three together.

mod projector;
mod resolver;
mod service;
mod top_ids;

#[cfg(test)]
pub(crate) mod fake;

pub use projector::ResultProjector;
pub use resolver::DetailResolver;
pub use service::AggregationService;
pub use top_ids::TopIdCacheLoader;
