//! Refresh lifecycle integration tests.
//!
//! These tests drive the service against a mock catalog and an on-disk
//! index:
//! - Idempotence of repeated refreshes
//! - Change detection per listing page
//! - Tombstoning of unlisted families
//! - Truncation and soft failures

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use fontindex_core::{
    index::{FontIndex, SqliteFontIndex},
    testing::{fixtures, MockCatalogApi},
    Config, FontIndexError, FontIndexService, RefreshOptions,
};

/// Test helper wiring a service to a mock catalog and a temp index file.
struct TestHarness {
    service: FontIndexService,
    api: Arc<MockCatalogApi>,
    db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("fonts.db");

        let mut config = Config::default();
        config.index.path = db_path.clone();
        config.refresh.page_size = 2;
        config.refresh.concurrency = 3;

        let api = Arc::new(MockCatalogApi::new());
        let service = FontIndexService::with_api(Arc::new(config), api.clone());

        Self {
            service,
            api,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    fn options(&self) -> RefreshOptions {
        self.service.default_refresh_options()
    }

    fn index(&self) -> SqliteFontIndex {
        SqliteFontIndex::new(&self.db_path).expect("Failed to open index")
    }

    fn stored_ids(&self) -> HashSet<String> {
        self.index().known_ids().unwrap()
    }
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::numbered_families("font", 5))
        .await;

    let first = h.service.refresh(&h.options()).await.unwrap();
    assert_eq!(first.entry_count, 5);
    assert_eq!(first.requested_count, 5);

    let families_before: Vec<_> = {
        let index = h.index();
        let mut ids: Vec<_> = h.stored_ids().into_iter().collect();
        ids.sort();
        ids.iter().map(|id| index.get(id).unwrap()).collect()
    };
    let fingerprints_before = h.index().page_fingerprints("full").unwrap();

    h.api.clear_recorded().await;
    let second = h.service.refresh(&h.options()).await.unwrap();

    assert_eq!(second.requested_count, 0);
    assert_eq!(second.fetched_count, 0);
    assert_eq!(second.pages_changed, 0);
    assert_eq!(second.entry_count, 5);
    assert!(h.api.family_requests().await.is_empty());

    let families_after: Vec<_> = {
        let index = h.index();
        let mut ids: Vec<_> = h.stored_ids().into_iter().collect();
        ids.sort();
        ids.iter().map(|id| index.get(id).unwrap()).collect()
    };
    assert_eq!(families_before, families_after);

    let fingerprints_after = h.index().page_fingerprints("full").unwrap();
    assert_eq!(fingerprints_before.len(), fingerprints_after.len());
    for (page, fp) in &fingerprints_before {
        assert_eq!(fp.hash, fingerprints_after[page].hash);
        assert_eq!(fp.entry_count, fingerprints_after[page].entry_count);
    }
}

#[tokio::test]
async fn test_rename_refetches_only_that_page() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::numbered_families("font", 6))
        .await;
    h.service.refresh(&h.options()).await.unwrap();

    // Page size 2: font-002 and font-003 share page 2.
    h.api.rename_family("font-002", "Font Two Renamed").await;
    h.api.clear_recorded().await;

    let result = h.service.refresh(&h.options()).await.unwrap();

    assert_eq!(result.pages_changed, 1);
    assert_eq!(result.requested_count, 2);
    let mut requested = h.api.family_requests().await;
    requested.sort();
    assert_eq!(requested, vec!["font-002", "font-003"]);
    assert_eq!(h.index().get("font-002").unwrap().name, "Font Two Renamed");
}

#[tokio::test]
async fn test_unlisted_family_is_tombstoned() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::scenario_families())
        .await;
    h.service.refresh(&h.options()).await.unwrap();
    assert!(h.stored_ids().contains("source-sans-3"));

    h.api.remove_from_listing("full", "source-sans-3").await;
    let result = h.service.refresh(&h.options()).await.unwrap();

    assert_eq!(result.removed_count, 1);
    assert_eq!(result.entry_count, 2);
    assert!(!h.stored_ids().contains("source-sans-3"));

    let status = h.service.status().unwrap();
    assert_eq!(status.entry_count, 2);
}

#[tokio::test]
async fn test_refreshing_another_library_drops_previous_one() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::numbered_families("full", 2))
        .await;
    h.api
        .set_catalog("trial", fixtures::numbered_families("trial", 1))
        .await;

    h.service.refresh(&h.options()).await.unwrap();
    assert_eq!(h.stored_ids().len(), 2);

    let trial_only = RefreshOptions {
        library: Some("trial".to_string()),
        ..h.options()
    };
    let result = h.service.refresh(&trial_only).await.unwrap();

    // Tombstoning only considers the libraries walked in this refresh.
    assert_eq!(result.removed_count, 2);
    assert_eq!(
        h.stored_ids(),
        ["trial-000".to_string()].into_iter().collect::<HashSet<_>>()
    );
    assert_eq!(h.service.status().unwrap().libraries, vec!["trial"]);
}

#[tokio::test]
async fn test_truncated_walk_warns() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::numbered_families("font", 7))
        .await;

    let options = RefreshOptions {
        max_pages: 2,
        ..h.options()
    };
    let result = h.service.refresh(&options).await.unwrap();

    assert_eq!(result.pages_walked, 2);
    assert_eq!(result.entry_count, 4);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("only the first 2"));
}

#[tokio::test]
async fn test_detail_failure_is_a_warning() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::scenario_families())
        .await;
    h.api.fail_family("droid-serif").await;

    let result = h.service.refresh(&h.options()).await.unwrap();

    assert_eq!(result.requested_count, 3);
    assert_eq!(result.fetched_count, 2);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("droid-serif"));
    assert!(h.service.status().unwrap().exists);
}

#[tokio::test]
async fn test_rename_survives_failed_refetch() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::scenario_families())
        .await;
    h.service.refresh(&h.options()).await.unwrap();

    h.api.rename_family("droid-serif", "Droid Serif Pro").await;
    h.api.fail_family("droid-serif").await;
    let failed = h.service.refresh(&h.options()).await.unwrap();
    assert_eq!(failed.warnings.len(), 1);
    assert_eq!(h.index().get("droid-serif").unwrap().name, "Droid Serif");

    h.api.heal_family("droid-serif").await;
    let healed = h.service.refresh(&h.options()).await.unwrap();

    // The page that failed is compared as changed again.
    assert_eq!(healed.pages_changed, 1);
    assert!(healed.requested_count >= 1);
    assert!(healed.warnings.is_empty());
    assert_eq!(
        h.index().get("droid-serif").unwrap().name,
        "Droid Serif Pro"
    );
}

#[tokio::test]
async fn test_explicit_invisible_library_still_attempted() {
    let h = TestHarness::new();
    h.api.add_library("full", "Full").await;

    let options = RefreshOptions {
        library: Some("hidden".to_string()),
        ..h.options()
    };
    let err = h.service.refresh(&options).await.unwrap_err();

    // The walk was attempted and failed on the unknown library.
    assert!(matches!(err, FontIndexError::Api(_)));
    assert!(h
        .api
        .page_requests()
        .await
        .contains(&("hidden".to_string(), 1)));
}

#[tokio::test]
async fn test_no_visible_library_is_fatal() {
    let h = TestHarness::new();
    let err = h.service.refresh(&h.options()).await.unwrap_err();
    assert!(matches!(err, FontIndexError::NoLibraries));
    assert!(!h.service.status().unwrap().exists);
}

#[tokio::test]
async fn test_status_after_refresh_is_fresh() {
    let h = TestHarness::new();
    h.api
        .set_catalog("full", fixtures::scenario_families())
        .await;
    h.service.refresh(&h.options()).await.unwrap();

    let status = h.service.status().unwrap();
    assert!(status.exists);
    assert!(!status.stale);
    assert_eq!(status.entry_count, 3);
    assert_eq!(status.libraries, vec!["full"]);
    assert!(status.last_refresh_at.is_some());

    let stats = h.service.stats(5).unwrap();
    assert_eq!(stats.entry_count, 3);
    assert_eq!(stats.distinct_classifications, 2);
    assert_eq!(stats.top_classifications[0].value, "serif");
    assert_eq!(stats.top_classifications[0].count, 2);
}
