//! Types for upstream listing responses.

use serde::{Deserialize, Serialize};

/// A library (catalog partition) visible to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibrarySummary {
    pub id: String,
    pub name: String,
}

/// Basic family entry as it appears in a library listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyRef {
    pub id: String,
    pub name: String,
}

/// One page of a library listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryPage {
    pub library_id: String,
    /// 1-based page number.
    pub page: u32,
    /// Total pages as reported (or inferred) for this library.
    pub page_count: u32,
    pub families: Vec<FamilyRef>,
}
