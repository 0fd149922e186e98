//! Prometheus metrics for the command line front end.
//!
//! Registers the core counters alongside gauges describing the mirror, and
//! renders everything in the text exposition format for `--metrics`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use prometheus::{self, Encoder, IntGauge, Registry, TextEncoder};

use fontindex_core::FontIndexService;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Index Metrics (collected dynamically)
// =============================================================================

/// Families in the local mirror.
pub static INDEX_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "fontindex_index_entries",
        "Number of families in the local index",
    )
    .unwrap()
});

/// Seconds since the last committed refresh, -1 without one.
pub static INDEX_AGE_SECONDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "fontindex_index_age_seconds",
        "Seconds since the last committed refresh",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry.register(Box::new(INDEX_ENTRIES.clone())).unwrap();
    registry
        .register(Box::new(INDEX_AGE_SECONDS.clone()))
        .unwrap();

    // Core metrics (HTTP, refresh, search)
    for metric in fontindex_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update index gauges from the mirror's current status.
pub fn collect_dynamic_metrics(service: &FontIndexService) {
    match service.status() {
        Ok(status) => {
            INDEX_ENTRIES.set(status.entry_count as i64);
            INDEX_AGE_SECONDS.set(age_seconds(status.last_refresh_at, Utc::now()));
        }
        Err(_) => {
            INDEX_ENTRIES.set(0);
            INDEX_AGE_SECONDS.set(-1);
        }
    }
}

fn age_seconds(last_refresh_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match last_refresh_at {
        Some(at) => (now - at).num_seconds().max(0),
        None => -1,
    }
}
