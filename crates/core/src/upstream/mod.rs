//! Upstream font catalog integration.
//!
//! The catalog is split into libraries (partitions) that list families
//! page by page; full family details come from a separate endpoint.
//! [`CatalogApi`] is the seam between the index/search code and the
//! network, so tests can swap in `testing::MockCatalogApi`.

mod dto;
mod paginator;
mod typekit;
mod types;

pub use dto::{family_from_value, libraries_from_value, library_page_from_value, FamilyDto};
pub use paginator::{
    scan_libraries, select_libraries, LibraryScan, LibrarySelection, LibraryWalker,
    LIBRARY_PRIORITY,
};
pub use typekit::{TypekitClient, TOKEN_HEADER};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::family::FontFamily;
use crate::http::HttpError;

/// Errors that can occur when talking to the upstream catalog.
#[derive(Debug, Error)]
pub enum CatalogApiError {
    /// Family or library does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport or status failure after retries.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Response was valid JSON but not a usable shape.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing token, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),

    /// The credentials cannot see any library.
    #[error("No library is visible to the configured credentials")]
    NoLibraries,
}

impl CatalogApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogApiError::NotFound(_))
    }
}

/// Read access to the upstream catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Libraries visible to the caller's credentials.
    async fn list_libraries(&self) -> Result<Vec<LibrarySummary>, CatalogApiError>;

    /// One page (1-based) of basic family entries for a library.
    async fn list_library_page(
        &self,
        library_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<LibraryPage, CatalogApiError>;

    /// Full details for one family. Unknown ids yield `NotFound`.
    async fn get_family(&self, family_id: &str) -> Result<FontFamily, CatalogApiError>;
}
