//! Two-tier font search.
//!
//! With a local mirror, queries run against the full-text index and fall
//! back to substring matching. Without one (or when the cache is bypassed)
//! the upstream catalog is scanned live and ranked heuristically. Both
//! tiers return the same [`FamilyResult`] shape.

mod live;
mod local;
mod query;

pub use live::{
    candidate_budget, rank_basic, rank_detailed, score_basic, score_detailed, search_live,
    LiveMatches, LiveScanOptions,
};
pub use local::{search_local, LocalMatches};
pub use query::{match_expression, tokenize, MAX_QUERY_TOKENS};

use serde::{Deserialize, Serialize};

use crate::family::FamilyResult;

/// Which path produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    /// Local full-text match.
    Fulltext,
    /// Local substring fallback.
    Substring,
    /// Live upstream scan.
    Live,
}

impl SearchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTier::Fulltext => "fulltext",
            SearchTier::Substring => "substring",
            SearchTier::Live => "live",
        }
    }
}

/// Search request options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Case-insensitive substring of the classification.
    #[serde(default)]
    pub classification: Option<String>,
    /// Case-insensitive language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Maximum results; the configured default when unset.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Only use the local mirror.
    #[serde(default)]
    pub cache_only: bool,
    /// Skip the local mirror and scan live.
    #[serde(default)]
    pub no_cache: bool,
    /// Refresh the mirror before searching.
    #[serde(default)]
    pub refresh_first: bool,
}

/// Search results plus non-fatal warnings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub entries: Vec<FamilyResult>,
    pub warnings: Vec<String>,
    pub tier: SearchTier,
}
