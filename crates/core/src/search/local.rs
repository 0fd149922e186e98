//! Search over the local mirror.

use tracing::debug;

use super::query::{match_expression, tokenize};
use super::SearchTier;
use crate::family::FontFamily;
use crate::index::{FontIndex, IndexError, SearchFilters};

/// Families found locally, the tier that produced them, and warnings.
#[derive(Debug, Clone)]
pub struct LocalMatches {
    pub families: Vec<FontFamily>,
    pub tier: SearchTier,
    pub warnings: Vec<String>,
}

/// Full-text search with a substring fallback.
///
/// An empty result is not an error; it carries a warning instead.
pub fn search_local(
    index: &dyn FontIndex,
    query: &str,
    filters: &SearchFilters,
    limit: usize,
) -> Result<LocalMatches, IndexError> {
    if let Some(expr) = match_expression(&tokenize(query)) {
        let families = index.search_fulltext(&expr, filters, limit)?;
        debug!(expr = %expr, hits = families.len(), "Full-text search");
        if !families.is_empty() {
            return Ok(LocalMatches {
                families,
                tier: SearchTier::Fulltext,
                warnings: Vec::new(),
            });
        }
    }

    let families = index.search_substring(query, filters, limit)?;
    debug!(hits = families.len(), "Substring search");

    let mut warnings = Vec::new();
    if families.is_empty() {
        warnings.push(format!(
            "No local matches for '{}'; the index may be out of date, try running a refresh",
            query.trim()
        ));
    }

    Ok(LocalMatches {
        families,
        tier: SearchTier::Substring,
        warnings,
    })
}
