//! Upstream listing service abstraction

use async_trait::async_trait;

use super::{ItemDetail, ItemId};

/// Source of ranked item ids and per-item details
///
/// Implementations never fail the caller: an unreachable upstream yields an
/// empty id list, and an unresolvable item yields `ItemDetail::placeholder`.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Returns the current ranking, highest priority first
    async fn fetch_ranked_ids(&self) -> Vec<ItemId>;

    /// Returns the detail record for `id`, or a placeholder
    async fn fetch_item(&self, id: ItemId) -> ItemDetail;
}
