use std::time::Duration;

use chrono::{DateTime, Utc};

/// Upper bound for any single wait between attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

const RETRYABLE_STATUSES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

/// Whether a response status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Delay before the next attempt.
///
/// `attempt` is zero-based (the attempt that just failed). A server hint
/// takes precedence; otherwise `base * 2^attempt`. Both are capped.
pub fn backoff_delay(attempt: u32, base: Duration, retry_after: Option<Duration>) -> Duration {
    if let Some(hint) = retry_after {
        return hint.min(MAX_BACKOFF);
    }
    let factor = 2u32.saturating_pow(attempt);
    base.checked_mul(factor).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF)
}

/// Parse a Retry-After header value (delta-seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - now;
    // A date in the past means "retry now".
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
