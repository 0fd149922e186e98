//! Testing utilities and mock implementations.
//!
//! [`MockCatalogApi`] stands in for the upstream catalog so refresh and
//! search can be exercised end to end against a real SQLite index without
//! network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use fontindex_core::testing::{fixtures, MockCatalogApi};
//!
//! let api = MockCatalogApi::new();
//! api.set_catalog("full", fixtures::scenario_families()).await;
//! api.fail_family("source-sans-3").await;
//! ```

mod mock_catalog_api;

pub use mock_catalog_api::{MockCatalogApi, RecordedCatalogQuery};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::family::{FontFamily, Variation};
    use crate::upstream::FamilyRef;

    /// Basic listing entry.
    pub fn family_ref(id: &str, name: &str) -> FamilyRef {
        FamilyRef {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    /// A family with reasonable defaults; the slug equals the id.
    pub fn font_family(id: &str, name: &str, classification: &str) -> FontFamily {
        FontFamily {
            id: id.to_string(),
            slug: id.to_string(),
            name: name.to_string(),
            description: "A test family.".to_string(),
            web_link: Some(format!("https://fonts.adobe.com/fonts/{}", id)),
            classification: classification.to_string(),
            foundry: "Test Foundry".to_string(),
            css_stack: format!("\"{}\"", id),
            languages: vec!["en".to_string()],
            variations: vec![
                Variation {
                    style: "normal".to_string(),
                    weight: 400,
                },
                Variation {
                    style: "normal".to_string(),
                    weight: 700,
                },
            ],
            updated_at: None,
        }
    }

    /// The three-family catalog used by the search scenarios.
    pub fn scenario_families() -> Vec<FontFamily> {
        vec![
            font_family("droid-serif", "Droid Serif", "serif"),
            font_family("source-sans-3", "Source Sans 3", "sans-serif"),
            font_family("adobe-caslon-pro", "Adobe Caslon Pro", "serif"),
        ]
    }

    /// `count` generic families `{prefix}-000`, `{prefix}-001`, ...
    pub fn numbered_families(prefix: &str, count: usize) -> Vec<FontFamily> {
        (0..count)
            .map(|i| {
                font_family(
                    &format!("{}-{:03}", prefix, i),
                    &format!("{} {:03}", capitalize(prefix), i),
                    "sans-serif",
                )
            })
            .collect()
    }

    fn capitalize(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
