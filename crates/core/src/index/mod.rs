//! Local font index - a persisted mirror of the upstream catalog.
//!
//! Families are the authoritative rows. A full-text shadow table over the
//! searchable columns is derived from them and rebuilt after every
//! refresh, together with per-page listing fingerprints and a small
//! metadata table.

mod sqlite;
mod types;

pub use sqlite::SqliteFontIndex;
pub use types::*;

use std::collections::{HashMap, HashSet};

use crate::family::FontFamily;

/// Trait for font index storage.
pub trait FontIndex: Send + Sync {
    /// Insert or replace families by id. Returns the number written.
    fn upsert(&self, families: &[FontFamily]) -> Result<usize, IndexError>;

    /// Delete every family whose id is not in `live_ids`.
    ///
    /// Returns the number of families removed.
    fn delete_not_in(&self, live_ids: &HashSet<String>) -> Result<usize, IndexError>;

    /// Rebuild the full-text shadow table from the families table.
    fn rebuild_fulltext(&self) -> Result<(), IndexError>;

    /// Stored fingerprints of one library, keyed by page number.
    fn page_fingerprints(&self, library_id: &str)
        -> Result<HashMap<u32, PageFingerprint>, IndexError>;

    /// Ids of all stored families.
    fn known_ids(&self) -> Result<HashSet<String>, IndexError>;

    /// Apply a whole refresh atomically: upsert, tombstone, replace the
    /// covered libraries' fingerprints, rebuild full text and record
    /// metadata. Readers see either the old or the new state.
    fn apply_refresh(&self, batch: &RefreshBatch) -> Result<CommitSummary, IndexError>;

    /// Get index status.
    fn status(&self) -> Result<IndexStatus, IndexError>;

    /// Get index statistics with the top `limit` buckets per facet.
    fn stats(&self, limit: usize) -> Result<IndexStats, IndexError>;

    /// Full-text query ordered by relevance, then name.
    ///
    /// `match_expr` is an FTS5 query expression.
    fn search_fulltext(
        &self,
        match_expr: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<FontFamily>, IndexError>;

    /// Substring match on name, slug or description, ordered by name.
    fn search_substring(
        &self,
        needle: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<FontFamily>, IndexError>;

    /// Get a specific family by id.
    fn get(&self, id: &str) -> Result<FontFamily, IndexError>;
}
