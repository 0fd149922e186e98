//! Types for the local font index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::family::FontFamily;

/// Stored identity hash of one listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageFingerprint {
    pub library_id: String,
    pub page: u32,
    /// Hex digest over the page's ordered (id, name) pairs.
    pub hash: String,
    pub entry_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// Everything a refresh writes, applied in one transaction.
#[derive(Debug, Clone, Default)]
pub struct RefreshBatch {
    /// Families fetched in full during this refresh.
    pub families: Vec<FontFamily>,
    /// Every family id seen in the walked listings.
    pub live_ids: HashSet<String>,
    /// Libraries covered; their fingerprints are replaced wholesale.
    pub library_ids: Vec<String>,
    pub fingerprints: Vec<PageFingerprint>,
    pub refreshed_at: DateTime<Utc>,
}

/// Outcome of applying a [`RefreshBatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub upserted: usize,
    pub removed: usize,
    pub entry_count: u64,
}

/// Raw index status as stored; staleness is derived by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
    /// A refresh has been committed at least once.
    pub exists: bool,
    pub entry_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// Libraries covered by the last refresh.
    pub libraries: Vec<String>,
}

/// A grouped value and how many families carry it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountBucket {
    pub value: String,
    pub count: u64,
}

/// Index statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub entry_count: u64,
    pub distinct_classifications: u64,
    pub distinct_foundries: u64,
    pub top_classifications: Vec<CountBucket>,
    pub top_foundries: Vec<CountBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<DateTime<Utc>>,
}

/// Optional result filters, normalized to trimmed lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Substring of the classification.
    pub classification: Option<String>,
    /// Exact member of the language set.
    pub language: Option<String>,
}

impl SearchFilters {
    pub fn new(classification: Option<&str>, language: Option<&str>) -> Self {
        fn normalize(value: Option<&str>) -> Option<String> {
            value
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        }
        Self {
            classification: normalize(classification),
            language: normalize(language),
        }
    }

    /// Whether a family passes both filters.
    pub fn matches(&self, family: &FontFamily) -> bool {
        self.classification
            .as_deref()
            .is_none_or(|c| family.matches_classification(c))
            && self
                .language
                .as_deref()
                .is_none_or(|l| family.supports_language(l))
    }
}

/// Errors for index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The store or its full-text capability cannot be used.
    #[error("Local index unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("Corrupt index row: {0}")]
    Corrupt(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
