//! Core data models for the top stories service
//!
//! This module contains the item identifier and item detail types shared by
//! the cache, the upstream client and the aggregation pipeline, plus the
//! `ListingSource` trait that abstracts the upstream listing service.

pub mod hacker_news;
pub mod source;

pub use hacker_news::{HackerNewsClient, UpstreamError};
pub use source::ListingSource;

use chrono::{DateTime, Utc};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a rankable item as assigned by the upstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Detail record for a single item
///
/// Known upstream fields are typed; anything else the upstream returns is
/// kept in `extra` and written back out untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    /// Upstream identifier
    pub id: ItemId,
    /// Headline, absent for deleted items and placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Link target; an absent or blank URL marks the item as invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Submitting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    /// Upvote score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    /// Submission time in Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Total comment count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descendants: Option<u32>,
    /// Item kind ("story", "job", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Number of items matching the current filter.
    ///
    /// Request scoped: only set on items returned in a result page.
    #[serde(
        rename = "totalRecords",
        default,
        deserialize_with = "discard_total_records",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_records: Option<usize>,
    /// Remaining upstream fields, passed through as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Drops any upstream-supplied match count so it never reaches a result page
fn discard_total_records<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(None)
}

impl ItemDetail {
    /// Creates a record with only an identifier set
    ///
    /// Used whenever the upstream has nothing usable for an id. Placeholders
    /// carry no URL and are therefore always invalid.
    pub fn placeholder(id: ItemId) -> Self {
        Self {
            id,
            title: None,
            url: None,
            by: None,
            score: None,
            time: None,
            descendants: None,
            kind: None,
            total_records: None,
            extra: Map::new(),
        }
    }

    /// Returns true if the item links somewhere (non-blank URL)
    pub fn is_valid(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    /// Submission time as a UTC timestamp, if the upstream reported one
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.time.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}
