//! Filtering, match counting and paging of resolved items

use crate::data::ItemDetail;

/// Produces one page of items matching a title query
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultProjector;

impl ResultProjector {
    pub fn new() -> Self {
        Self
    }

    /// Filters `items` by `query`, stamps the match count on every match, and
    /// returns page `page_number` (1-based) of size `page_size`
    ///
    /// A blank query matches everything; otherwise an item matches when its
    /// title contains the query, ignoring case. Items without a title never
    /// match a non-blank query. Pages past the end are empty.
    pub fn project(
        &self,
        items: Vec<ItemDetail>,
        page_number: usize,
        page_size: usize,
        query: &str,
    ) -> Vec<ItemDetail> {
        let needle = query.to_lowercase();
        let match_all = query.trim().is_empty();

        let matches: Vec<ItemDetail> = items
            .into_iter()
            .filter(|item| match_all || title_contains(item, &needle))
            .collect();
        let total_records = matches.len();

        let skip = page_number.saturating_sub(1).saturating_mul(page_size);
        matches
            .into_iter()
            .skip(skip)
            .take(page_size)
            .map(|mut item| {
                item.total_records = Some(total_records);
                item
            })
            .collect()
    }
}

fn title_contains(item: &ItemDetail, needle: &str) -> bool {
    item.title
        .as_deref()
        .is_some_and(|title| title.to_lowercase().contains(needle))
}
