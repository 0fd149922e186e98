//! Live heuristic search against the upstream catalog.
//!
//! Used when there is no local mirror. Basic listing entries are scored
//! on name and id, the best candidates are resolved to full details, and
//! those are re-scored with hard classification and language filters.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::{debug, warn};

use crate::error::FontIndexError;
use crate::family::FontFamily;
use crate::index::SearchFilters;
use crate::pool::run_bounded;
use crate::upstream::{scan_libraries, CatalogApi, FamilyRef};

static WORD_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-]+").unwrap());

/// Listing and fan-out limits of a live scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveScanOptions {
    pub page_size: u32,
    pub max_pages: u32,
    pub concurrency: usize,
}

/// Candidates resolved to full details for a given result limit.
pub fn candidate_budget(limit: usize) -> usize {
    limit.saturating_mul(8).max(40)
}

/// Coarse score of a listing entry against a lower-cased query.
pub fn score_basic(family: &FamilyRef, query: &str) -> u32 {
    let name = family.name.to_lowercase();
    let mut score = if name == query {
        140
    } else if family.id.to_lowercase() == query {
        130
    } else if name.contains(query) {
        90
    } else {
        0
    };
    if WORD_BOUNDARY.split(&name).any(|word| word.starts_with(query)) {
        score += 35;
    }
    score
}

/// Score of a fully resolved family. Filter mismatches score zero.
///
/// Filter bonuses apply to every family that passes the filters, so a
/// candidate admitted on its id alone still ranks.
pub fn score_detailed(family: &FontFamily, query: &str, filters: &SearchFilters) -> u32 {
    if !filters.matches(family) {
        return 0;
    }

    let name = family.name.to_lowercase();
    let slug = family.slug.to_lowercase();
    let mut score = if name == query {
        120
    } else if slug == query {
        110
    } else if name.contains(query) {
        90
    } else if slug.contains(query) {
        70
    } else {
        0
    };

    if filters.classification.is_some() {
        score += 20;
    }
    if filters.language.is_some() {
        score += 15;
    }
    score
}

fn by_score_then_name(a: &(u32, String), b: &(u32, String)) -> Ordering {
    b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}

/// Non-zero basic matches, best first, cut to `budget`.
pub fn rank_basic(families: Vec<FamilyRef>, query: &str, budget: usize) -> Vec<FamilyRef> {
    let mut scored: Vec<((u32, String), FamilyRef)> = families
        .into_iter()
        .map(|f| ((score_basic(&f, query), f.name.to_lowercase()), f))
        .filter(|((score, _), _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| by_score_then_name(&a.0, &b.0));
    scored.into_iter().take(budget).map(|(_, f)| f).collect()
}

/// Non-zero detailed matches, best first, cut to `limit`.
pub fn rank_detailed(
    families: Vec<FontFamily>,
    query: &str,
    filters: &SearchFilters,
    limit: usize,
) -> Vec<FontFamily> {
    let mut scored: Vec<((u32, String), FontFamily)> = families
        .into_iter()
        .map(|f| ((score_detailed(&f, query, filters), f.name.to_lowercase()), f))
        .filter(|((score, _), _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| by_score_then_name(&a.0, &b.0));
    scored.into_iter().take(limit).map(|(_, f)| f).collect()
}

/// Families found live plus any warnings.
#[derive(Debug, Clone, Default)]
pub struct LiveMatches {
    pub families: Vec<FontFamily>,
    pub warnings: Vec<String>,
}

/// Scan the given libraries and rank their families against `query`.
pub async fn search_live(
    api: &dyn CatalogApi,
    library_ids: &[String],
    query: &str,
    filters: &SearchFilters,
    limit: usize,
    options: &LiveScanOptions,
) -> Result<LiveMatches, FontIndexError> {
    let query = query.trim().to_lowercase();
    let scan = scan_libraries(api, library_ids, options.page_size, options.max_pages).await?;
    let mut warnings = scan.warnings;

    let candidates = rank_basic(scan.families, &query, candidate_budget(limit));
    debug!(
        pages = scan.pages_walked,
        candidates = candidates.len(),
        "Live scan candidates"
    );

    let outcomes = run_bounded(candidates, options.concurrency, |candidate| async move {
        let outcome = api.get_family(&candidate.id).await;
        (candidate.id, outcome)
    })
    .await;

    let mut detailed = Vec::with_capacity(outcomes.len());
    for (id, outcome) in outcomes {
        match outcome {
            Ok(family) => detailed.push(family),
            Err(e) if e.is_not_found() => debug!(family = %id, "Candidate not found; skipping"),
            Err(e) => {
                let message = format!("Failed to fetch family {}: {}", id, e);
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    Ok(LiveMatches {
        families: rank_detailed(detailed, &query, filters, limit),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{family_ref, font_family};

    #[test]
    fn test_candidate_budget() {
        assert_eq!(candidate_budget(1), 40);
        assert_eq!(candidate_budget(5), 40);
        assert_eq!(candidate_budget(10), 80);
    }

    #[test]
    fn test_score_basic() {
        assert_eq!(score_basic(&family_ref("x", "Droid"), "droid"), 140 + 35);
        assert_eq!(score_basic(&family_ref("droid", "Other"), "droid"), 130);
        assert_eq!(score_basic(&family_ref("x", "Droid Serif"), "serif"), 90 + 35);
        assert_eq!(score_basic(&family_ref("x", "Androids"), "droid"), 90);
        assert_eq!(score_basic(&family_ref("x", "Adobe Garamond"), "droid"), 0);
    }

    #[test]
    fn test_score_detailed_filters_are_hard() {
        let family = font_family("droid-serif", "Droid Serif", "serif");

        let none = SearchFilters::default();
        assert_eq!(score_detailed(&family, "droid serif", &none), 120);
        assert_eq!(score_detailed(&family, "droid-serif", &none), 110);
        assert_eq!(score_detailed(&family, "droid", &none), 90);

        let class = SearchFilters::new(Some("serif"), None);
        assert_eq!(score_detailed(&family, "droid", &class), 110);

        let both = SearchFilters::new(Some("serif"), Some("en"));
        assert_eq!(score_detailed(&family, "droid", &both), 125);

        let wrong = SearchFilters::new(Some("script"), None);
        assert_eq!(score_detailed(&family, "droid", &wrong), 0);

        assert_eq!(score_detailed(&family, "caslon", &class), 20);
        assert_eq!(score_detailed(&family, "caslon", &SearchFilters::default()), 0);
    }

    #[test]
    fn test_id_only_candidate_kept_by_filter_bonus() {
        // Admitted on an exact id match; neither name nor slug holds the query.
        let mut family = font_family("gkmg", "Droid Sans", "sans-serif");
        family.slug = "droid-sans".to_string();
        let filters = SearchFilters::new(Some("sans"), None);

        assert_eq!(score_detailed(&family, "gkmg", &filters), 20);
        let ranked = rank_detailed(vec![family], "gkmg", &filters, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "gkmg");
    }

    #[test]
    fn test_slug_only_match() {
        let mut family = font_family("x", "Something Else", "serif");
        family.slug = "proxima-nova".to_string();
        assert_eq!(
            score_detailed(&family, "nova", &SearchFilters::default()),
            70
        );
    }

    #[test]
    fn test_rank_basic_orders_and_cuts() {
        let ranked = rank_basic(
            vec![
                family_ref("c", "Serif Gothic"),
                family_ref("a", "Droid Serif"),
                family_ref("b", "Adobe Garamond"),
                family_ref("d", "Serif"),
            ],
            "serif",
            2,
        );
        let ids: Vec<&str> = ranked.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);
    }

    #[test]
    fn test_rank_detailed_ties_by_name() {
        let ranked = rank_detailed(
            vec![
                font_family("2", "Zeta Sans", "sans-serif"),
                font_family("1", "Alpha Sans", "sans-serif"),
                font_family("3", "Beta Serif", "serif"),
            ],
            "sans",
            &SearchFilters::default(),
            10,
        );
        let ids: Vec<&str> = ranked.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
