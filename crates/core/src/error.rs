//! Errors returned by the service-level operations.

use thiserror::Error;

use crate::index::IndexError;
use crate::upstream::CatalogApiError;

#[derive(Debug, Error)]
pub enum FontIndexError {
    /// Bad caller input; never retried.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No library could be resolved for a refresh or live scan.
    #[error("No library is visible to the configured credentials")]
    NoLibraries,

    /// A cache-only search found no usable local index.
    #[error("No local index: {0}")]
    NoLocalIndex(String),

    /// Upstream access is needed but no API token is configured.
    #[error("Catalog API not configured: {0}")]
    NotConfigured(String),

    #[error("Catalog API error: {0}")]
    Api(CatalogApiError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl From<CatalogApiError> for FontIndexError {
    fn from(err: CatalogApiError) -> Self {
        match err {
            CatalogApiError::NoLibraries => FontIndexError::NoLibraries,
            CatalogApiError::NotConfigured(message) => FontIndexError::NotConfigured(message),
            other => FontIndexError::Api(other),
        }
    }
}

impl FontIndexError {
    /// HTTP status of the underlying upstream failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FontIndexError::Api(CatalogApiError::Http(e)) => e.status(),
            _ => None,
        }
    }
}
