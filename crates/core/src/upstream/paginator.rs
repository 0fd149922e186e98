//! Library selection and sequential page walking.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::types::{FamilyRef, LibraryPage};
use super::{CatalogApi, CatalogApiError};

/// Preferred libraries, most complete first.
pub const LIBRARY_PRIORITY: &[&str] = &["full", "personal", "trial"];

/// Libraries chosen for a refresh or live scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySelection {
    pub library_ids: Vec<String>,
    pub warnings: Vec<String>,
}

/// Resolve which libraries to walk.
///
/// An explicit library is always attempted, even when it is not among the
/// visible ones (a warning is recorded instead). Without one, the first
/// visible id from [`LIBRARY_PRIORITY`] wins, else the first visible library.
pub async fn select_libraries(
    api: &dyn CatalogApi,
    requested: Option<&str>,
) -> Result<LibrarySelection, CatalogApiError> {
    let requested = requested.map(str::trim).filter(|s| !s.is_empty());

    if let Some(library_id) = requested {
        let mut warnings = Vec::new();
        match api.list_libraries().await {
            Ok(visible) => {
                if !visible.iter().any(|l| l.id == library_id) {
                    let message = format!(
                        "Library '{}' is not visible to these credentials; trying it anyway",
                        library_id
                    );
                    warn!("{}", message);
                    warnings.push(message);
                }
            }
            Err(e) => {
                let message = format!("Could not list libraries: {}", e);
                warn!("{}", message);
                warnings.push(message);
            }
        }
        return Ok(LibrarySelection {
            library_ids: vec![library_id.to_string()],
            warnings,
        });
    }

    let visible = api.list_libraries().await?;
    let chosen = LIBRARY_PRIORITY
        .iter()
        .find_map(|p| visible.iter().find(|l| l.id == *p))
        .or_else(|| visible.first())
        .ok_or(CatalogApiError::NoLibraries)?;

    debug!(library = %chosen.id, "Selected library");
    Ok(LibrarySelection {
        library_ids: vec![chosen.id.clone()],
        warnings: Vec::new(),
    })
}

/// Walks one library's listing page by page.
///
/// Pages are requested strictly in order since the page count is only
/// known after the first response. The walk ends after the last page, on
/// the first empty page, or once `max_pages` pages have been read.
pub struct LibraryWalker<'a> {
    api: &'a dyn CatalogApi,
    library_id: String,
    page_size: u32,
    max_pages: u32,
    next: u32,
    page_count: Option<u32>,
    done: bool,
    truncated: bool,
}

impl<'a> LibraryWalker<'a> {
    pub fn new(api: &'a dyn CatalogApi, library_id: &str, page_size: u32, max_pages: u32) -> Self {
        Self {
            api,
            library_id: library_id.to_string(),
            page_size,
            max_pages,
            next: 1,
            page_count: None,
            done: false,
            truncated: false,
        }
    }

    pub fn library_id(&self) -> &str {
        &self.library_id
    }

    /// Next page, or `None` once the walk is over.
    pub async fn next_page(&mut self) -> Result<Option<LibraryPage>, CatalogApiError> {
        if self.done {
            return Ok(None);
        }
        if matches!(self.page_count, Some(count) if self.next > count) {
            self.done = true;
            return Ok(None);
        }
        if self.next > self.max_pages {
            self.done = true;
            self.truncated = self.page_count.is_some_and(|count| count > self.max_pages);
            return Ok(None);
        }

        let page = self
            .api
            .list_library_page(&self.library_id, self.next, self.page_size)
            .await?;
        debug!(
            library = %self.library_id,
            page = page.page,
            page_count = page.page_count,
            families = page.families.len(),
            "Fetched library page"
        );

        self.page_count = Some(page.page_count);
        if page.families.is_empty() {
            self.done = true;
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(page))
    }

    /// Pages read so far.
    pub fn pages_walked(&self) -> u32 {
        self.next - 1
    }

    /// True when the walk stopped at `max_pages` with pages left over.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Warning describing a truncated walk.
    pub fn truncation_warning(&self) -> Option<String> {
        if !self.truncated {
            return None;
        }
        Some(format!(
            "Library '{}' has {} pages; only the first {} were read",
            self.library_id,
            self.page_count.unwrap_or_default(),
            self.max_pages
        ))
    }
}

/// Basic entries gathered from a set of libraries.
#[derive(Debug, Clone, Default)]
pub struct LibraryScan {
    /// Unique by id, in listing order.
    pub families: Vec<FamilyRef>,
    pub pages_walked: u32,
    pub warnings: Vec<String>,
}

/// Walk every page (up to `max_pages` each) of the given libraries.
pub async fn scan_libraries(
    api: &dyn CatalogApi,
    library_ids: &[String],
    page_size: u32,
    max_pages: u32,
) -> Result<LibraryScan, CatalogApiError> {
    let mut scan = LibraryScan::default();
    let mut seen = HashSet::new();

    for library_id in library_ids {
        let mut walker = LibraryWalker::new(api, library_id, page_size, max_pages);
        while let Some(page) = walker.next_page().await? {
            for family in page.families {
                if seen.insert(family.id.clone()) {
                    scan.families.push(family);
                }
            }
        }
        scan.pages_walked += walker.pages_walked();
        if let Some(message) = walker.truncation_warning() {
            warn!("{}", message);
            scan.warnings.push(message);
        }
    }

    Ok(scan)
}
