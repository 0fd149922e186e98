//! Search tier integration tests.
//!
//! Covers the local full-text tier and its substring fallback, filter
//! correctness, and the live heuristic scan used without a mirror.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use fontindex_core::{
    testing::{fixtures, MockCatalogApi, RecordedCatalogQuery},
    Config, FontIndexError, FontIndexService, SearchOptions, SearchTier,
};

struct TestHarness {
    service: FontIndexService,
    api: Arc<MockCatalogApi>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        config.index.path = temp_dir.path().join("fonts.db");

        let api = Arc::new(MockCatalogApi::new());
        let service = FontIndexService::with_api(Arc::new(config), api.clone());

        Self {
            service,
            api,
            _temp_dir: temp_dir,
        }
    }

    async fn seeded(families: Vec<fontindex_core::FontFamily>) -> Self {
        let h = Self::new();
        h.api.set_catalog("full", families).await;
        h.service
            .refresh(&h.service.default_refresh_options())
            .await
            .expect("refresh failed");
        h
    }

    fn db_path(&self) -> PathBuf {
        self.service.config().index.path.clone()
    }
}

fn ids(response: &fontindex_core::SearchResponse) -> Vec<&str> {
    response.entries.iter().map(|e| e.id.as_str()).collect()
}

#[tokio::test]
async fn test_scenario_refresh_and_search() {
    let h = TestHarness::seeded(fixtures::scenario_families()).await;
    assert_eq!(h.service.status().unwrap().entry_count, 3);

    let droid = h
        .service
        .search("droid", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(ids(&droid), vec!["droid-serif"]);
    assert_eq!(droid.tier, SearchTier::Fulltext);

    let serif = h
        .service
        .search(
            "serif",
            &SearchOptions {
                classification: Some("serif".to_string()),
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(&serif), vec!["droid-serif", "adobe-caslon-pro"]);
}

#[tokio::test]
async fn test_classification_filter_is_respected() {
    let h = TestHarness::seeded(fixtures::scenario_families()).await;

    let response = h
        .service
        .search(
            "serif",
            &SearchOptions {
                classification: Some("sans-serif".to_string()),
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();

    for entry in &response.entries {
        assert!(entry.classification.to_lowercase().contains("sans-serif"));
    }
}

#[tokio::test]
async fn test_language_filter_is_respected() {
    let mut families = fixtures::scenario_families();
    families[2].languages = vec!["en".to_string(), "fr".to_string()];
    let h = TestHarness::seeded(families).await;

    let response = h
        .service
        .search(
            "test",
            &SearchOptions {
                language: Some("FR".to_string()),
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(&response), vec!["adobe-caslon-pro"]);
}

#[tokio::test]
async fn test_description_substring_fallback() {
    let mut families = fixtures::scenario_families();
    families[1].description = "Designed for screen legibility.".to_string();
    let h = TestHarness::seeded(families).await;

    // "egibil" starts no token, so only the substring path can find it.
    let response = h
        .service
        .search("egibil", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(response.tier, SearchTier::Substring);
    assert_eq!(ids(&response), vec!["source-sans-3"]);
    assert!(response.warnings.is_empty());
}

#[tokio::test]
async fn test_no_local_match_warns_without_error() {
    let h = TestHarness::seeded(fixtures::scenario_families()).await;
    let response = h
        .service
        .search("helvetica", &SearchOptions::default())
        .await
        .unwrap();

    assert!(response.entries.is_empty());
    assert_eq!(response.warnings.len(), 1);
}

#[tokio::test]
async fn test_limit_applies() {
    let h = TestHarness::seeded(fixtures::numbered_families("font", 10)).await;
    let response = h
        .service
        .search(
            "font",
            &SearchOptions {
                limit: Some(3),
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.entries.len(), 3);
}

#[tokio::test]
async fn test_live_tier_without_mirror() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::scenario_families())
        .await;

    let response = h
        .service
        .search("serif", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.tier, SearchTier::Live);
    // Listing entries are scored on name and id only.
    assert_eq!(ids(&response), vec!["droid-serif"]);
    assert!(!h.db_path().exists());
}

#[tokio::test]
async fn test_live_tier_hard_filters() {
    let h = TestHarness::new();
    let mut families = fixtures::scenario_families();
    families.push(fixtures::font_family("droid-sans", "Droid Sans", "sans-serif"));
    h.api.set_catalog("full", families).await;

    let response = h
        .service
        .search(
            "droid",
            &SearchOptions {
                classification: Some("sans".to_string()),
                no_cache: true,
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(ids(&response), vec!["droid-sans"]);
    assert_eq!(response.entries[0].weights, vec![400, 700]);
}

#[tokio::test]
async fn test_live_tier_resolves_only_candidates() {
    let h = TestHarness::new();
    let mut families = fixtures::numbered_families("font", 5);
    families.push(fixtures::font_family("droid-serif", "Droid Serif", "serif"));
    h.api.set_catalog("full", families).await;

    h.service
        .search("droid", &SearchOptions::default())
        .await
        .unwrap();

    // Only the listing entry that scored above zero is resolved.
    assert_eq!(h.api.family_requests().await, vec!["droid-serif"]);
}

#[tokio::test]
async fn test_no_cache_bypasses_mirror() {
    let h = TestHarness::seeded(fixtures::scenario_families()).await;
    h.api.clear_recorded().await;

    let response = h
        .service
        .search(
            "droid",
            &SearchOptions {
                no_cache: true,
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(response.tier, SearchTier::Live);
    assert!(h
        .api
        .recorded_queries()
        .await
        .contains(&RecordedCatalogQuery::ListLibraries));
}

#[tokio::test]
async fn test_cache_only_never_calls_upstream() {
    let h = TestHarness::seeded(fixtures::scenario_families()).await;
    h.api.clear_recorded().await;

    let response = h
        .service
        .search(
            "caslon",
            &SearchOptions {
                cache_only: true,
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(ids(&response), vec!["adobe-caslon-pro"]);
    assert!(h.api.recorded_queries().await.is_empty());
}

#[tokio::test]
async fn test_refresh_first_builds_mirror() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::scenario_families())
        .await;
    h.api.fail_family("source-sans-3").await;

    let response = h
        .service
        .search(
            "caslon",
            &SearchOptions {
                refresh_first: true,
                ..SearchOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(response.tier, SearchTier::Fulltext);
    assert_eq!(ids(&response), vec!["adobe-caslon-pro"]);
    // The refresh warning is carried into the search response.
    assert!(response.warnings[0].contains("source-sans-3"));
}

#[tokio::test]
async fn test_live_search_needs_token() {
    let mut config = Config::default();
    let temp_dir = TempDir::new().unwrap();
    config.index.path = temp_dir.path().join("fonts.db");
    let service = FontIndexService::from_config(Arc::new(config)).unwrap();

    let err = service
        .search("droid", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FontIndexError::NotConfigured(_)));
}
