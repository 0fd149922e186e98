//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Upstream HTTP traffic (attempts, retries)
//! - Refresh (duration, pages, detail fetches)
//! - Search (queries by tier)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Upstream HTTP
// =============================================================================

/// HTTP attempts by outcome.
pub static HTTP_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fontindex_http_attempts_total", "Upstream HTTP attempts"),
        &["outcome"], // "success", "status", "network"
    )
    .unwrap()
});

/// Retries scheduled after a retryable failure.
pub static HTTP_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fontindex_http_retries_total",
        "Upstream HTTP retries after a retryable failure",
    )
    .unwrap()
});

// =============================================================================
// Refresh
// =============================================================================

/// Refresh duration in seconds.
pub static REFRESH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fontindex_refresh_duration_seconds",
            "Duration of a full index refresh",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Listing pages walked during refresh, by fingerprint state.
pub static REFRESH_PAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fontindex_refresh_pages_total", "Listing pages walked"),
        &["state"], // "changed", "unchanged"
    )
    .unwrap()
});

/// Family detail fetches by outcome.
pub static DETAIL_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fontindex_detail_fetches_total", "Family detail fetches"),
        &["outcome"], // "ok", "not_found", "failed"
    )
    .unwrap()
});

// =============================================================================
// Search
// =============================================================================

/// Searches by tier.
pub static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fontindex_searches_total", "Searches executed"),
        &["tier"], // "fulltext", "substring", "live"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(HTTP_ATTEMPTS.clone()),
        Box::new(HTTP_RETRIES.clone()),
        Box::new(REFRESH_DURATION.clone()),
        Box::new(REFRESH_PAGES.clone()),
        Box::new(DETAIL_FETCHES.clone()),
        Box::new(SEARCHES.clone()),
    ]
}
