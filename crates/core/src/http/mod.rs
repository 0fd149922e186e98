//! Resilient HTTP layer for the upstream catalog API.
//!
//! Every request carries its own timeout and is retried on connection
//! failures, timeouts and transient statuses. A server-supplied
//! `Retry-After` hint wins over exponential backoff; both are capped at
//! [`MAX_BACKOFF`].

mod backoff;
mod client;

pub use backoff::{backoff_delay, is_retryable_status, parse_retry_after, MAX_BACKOFF};
pub use client::{HttpClient, HttpClientConfig, RequestOptions};

use thiserror::Error;

/// Errors surfaced by the HTTP layer once the retry budget is spent.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection failure or timeout.
    #[error("Network error after {attempts} attempt(s): {message}")]
    Network { message: String, attempts: u32 },

    /// Non-success HTTP status.
    #[error("HTTP {status} after {attempts} attempt(s): {body}")]
    Status {
        status: u16,
        body: String,
        attempts: u32,
    },

    /// Response body could not be decoded.
    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// Request could not be built (bad base URL, header, etc.).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    /// HTTP status, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
