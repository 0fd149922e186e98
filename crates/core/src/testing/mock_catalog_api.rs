//! Mock upstream catalog for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::family::FontFamily;
use crate::http::HttpError;
use crate::upstream::{CatalogApi, CatalogApiError, FamilyRef, LibraryPage, LibrarySummary};

/// A recorded catalog call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCatalogQuery {
    ListLibraries,
    ListLibraryPage {
        library_id: String,
        page: u32,
        page_size: u32,
    },
    GetFamily {
        family_id: String,
    },
}

/// Mock implementation of the CatalogApi trait.
///
/// Provides controllable behavior for testing:
/// - Visible libraries and their (paged) listings
/// - Family details, independent from listings so listing-only or
///   detail-less families can be simulated
/// - Per-family failures and a one-shot next error
/// - Call recording
///
/// # Example
///
/// ```rust,ignore
/// use fontindex_core::testing::{fixtures, MockCatalogApi};
///
/// let api = MockCatalogApi::new();
/// api.set_catalog("full", fixtures::scenario_families()).await;
///
/// let page = api.list_library_page("full", 1, 100).await?;
/// assert_eq!(page.families.len(), 3);
/// ```
#[derive(Debug)]
pub struct MockCatalogApi {
    /// Visible libraries, in listing order.
    libraries: Arc<RwLock<Vec<LibrarySummary>>>,
    /// Listing content by library id.
    listings: Arc<RwLock<HashMap<String, Vec<FamilyRef>>>>,
    /// Family details by id.
    families: Arc<RwLock<HashMap<String, FontFamily>>>,
    /// Families whose detail fetch fails with a server error.
    failing: Arc<RwLock<HashSet<String>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<RecordedCatalogQuery>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<CatalogApiError>>>,
}

impl Default for MockCatalogApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogApi {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self {
            libraries: Arc::new(RwLock::new(Vec::new())),
            listings: Arc::new(RwLock::new(HashMap::new())),
            families: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Libraries
    // =========================================================================

    /// Make a library visible.
    pub async fn add_library(&self, id: &str, name: &str) {
        let mut libraries = self.libraries.write().await;
        if !libraries.iter().any(|l| l.id == id) {
            libraries.push(LibrarySummary {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
    }

    /// Replace a library's listing. The library becomes visible.
    pub async fn set_library_families(&self, library_id: &str, families: Vec<FamilyRef>) {
        self.add_library(library_id, library_id).await;
        self.listings
            .write()
            .await
            .insert(library_id.to_string(), families);
    }

    /// Remove one family from a library's listing (details are kept).
    pub async fn remove_from_listing(&self, library_id: &str, family_id: &str) {
        if let Some(listing) = self.listings.write().await.get_mut(library_id) {
            listing.retain(|f| f.id != family_id);
        }
    }

    // =========================================================================
    // Families
    // =========================================================================

    /// Add or replace family details.
    pub async fn add_family(&self, family: FontFamily) {
        self.families
            .write()
            .await
            .insert(family.id.clone(), family);
    }

    /// Remove family details so that fetching it yields `NotFound`.
    pub async fn remove_family(&self, family_id: &str) {
        self.families.write().await.remove(family_id);
    }

    /// List the given families in a library and register their details.
    pub async fn set_catalog(&self, library_id: &str, families: Vec<FontFamily>) {
        let refs = families
            .iter()
            .map(|f| FamilyRef {
                id: f.id.clone(),
                name: f.name.clone(),
            })
            .collect();
        self.set_library_families(library_id, refs).await;
        for family in families {
            self.add_family(family).await;
        }
    }

    /// Rename a family in every listing and in its details.
    pub async fn rename_family(&self, family_id: &str, name: &str) {
        for listing in self.listings.write().await.values_mut() {
            for entry in listing.iter_mut().filter(|f| f.id == family_id) {
                entry.name = name.to_string();
            }
        }
        if let Some(family) = self.families.write().await.get_mut(family_id) {
            family.name = name.to_string();
        }
    }

    /// Make detail fetches of a family fail with HTTP 500.
    pub async fn fail_family(&self, family_id: &str) {
        self.failing.write().await.insert(family_id.to_string());
    }

    /// Stop failing detail fetches of a family.
    pub async fn heal_family(&self, family_id: &str) {
        self.failing.write().await.remove(family_id);
    }

    // =========================================================================
    // Query Recording
    // =========================================================================

    /// Get all recorded queries.
    pub async fn recorded_queries(&self) -> Vec<RecordedCatalogQuery> {
        self.queries.read().await.clone()
    }

    /// Family ids whose details were requested, in request order.
    pub async fn family_requests(&self) -> Vec<String> {
        self.queries
            .read()
            .await
            .iter()
            .filter_map(|q| match q {
                RecordedCatalogQuery::GetFamily { family_id } => Some(family_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// (library, page) pairs requested, in request order.
    pub async fn page_requests(&self) -> Vec<(String, u32)> {
        self.queries
            .read()
            .await
            .iter()
            .filter_map(|q| match q {
                RecordedCatalogQuery::ListLibraryPage {
                    library_id, page, ..
                } => Some((library_id.clone(), *page)),
                _ => None,
            })
            .collect()
    }

    /// Clear recorded queries.
    pub async fn clear_recorded(&self) {
        self.queries.write().await.clear();
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogApiError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<CatalogApiError> {
        self.next_error.write().await.take()
    }

    /// Record a query.
    async fn record(&self, query: RecordedCatalogQuery) {
        self.queries.write().await.push(query);
    }
}

#[async_trait]
impl CatalogApi for MockCatalogApi {
    async fn list_libraries(&self) -> Result<Vec<LibrarySummary>, CatalogApiError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCatalogQuery::ListLibraries).await;
        Ok(self.libraries.read().await.clone())
    }

    async fn list_library_page(
        &self,
        library_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<LibraryPage, CatalogApiError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCatalogQuery::ListLibraryPage {
            library_id: library_id.to_string(),
            page,
            page_size,
        })
        .await;

        let listings = self.listings.read().await;
        let listing = listings
            .get(library_id)
            .ok_or_else(|| CatalogApiError::NotFound(format!("Library {}", library_id)))?;

        let page_size = page_size.max(1) as usize;
        let page_count = listing.len().div_ceil(page_size) as u32;
        let start = (page.saturating_sub(1) as usize) * page_size;
        let families = listing.iter().skip(start).take(page_size).cloned().collect();

        Ok(LibraryPage {
            library_id: library_id.to_string(),
            page,
            page_count,
            families,
        })
    }

    async fn get_family(&self, family_id: &str) -> Result<FontFamily, CatalogApiError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCatalogQuery::GetFamily {
            family_id: family_id.to_string(),
        })
        .await;

        if self.failing.read().await.contains(family_id) {
            return Err(CatalogApiError::Http(HttpError::Status {
                status: 500,
                body: "internal error".to_string(),
                attempts: 3,
            }));
        }

        self.families
            .read()
            .await
            .get(family_id)
            .cloned()
            .ok_or_else(|| CatalogApiError::NotFound(format!("Family {}", family_id)))
    }
}
