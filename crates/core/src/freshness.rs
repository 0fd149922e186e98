//! Mirror freshness derived from the last refresh time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// State of the local mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessState {
    /// No refresh has ever been committed.
    Absent,
    Fresh,
    Stale,
}

impl FreshnessState {
    pub fn evaluate(
        last_refresh_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        stale_after_hours: u64,
    ) -> Self {
        match last_refresh_at {
            None => FreshnessState::Absent,
            Some(last) if is_stale(last, now, stale_after_hours) => FreshnessState::Stale,
            Some(_) => FreshnessState::Fresh,
        }
    }
}

/// True once more than `stale_after_hours` have passed since `last_refresh_at`.
pub fn is_stale(last_refresh_at: DateTime<Utc>, now: DateTime<Utc>, stale_after_hours: u64) -> bool {
    let window = i64::try_from(stale_after_hours)
        .ok()
        .and_then(Duration::try_hours)
        .unwrap_or(Duration::MAX);
    now.signed_duration_since(last_refresh_at) > window
}
