//! Wire shapes for the Typekit JSON API and their mapping to local types.
//!
//! Responses are decoded into `serde_json::Value` first and then mapped
//! here, so both enveloped (`{"family": {...}}`) and bare bodies are
//! accepted. Several fields have historical alternates which are folded
//! into the canonical [`FontFamily`] shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::types::{FamilyRef, LibraryPage, LibrarySummary};
use super::CatalogApiError;
use crate::family::{FontFamily, Variation};

#[derive(Debug, Deserialize)]
struct LibrariesResponse {
    #[serde(default)]
    libraries: Vec<LibraryDto>,
}

#[derive(Debug, Deserialize)]
struct LibraryDto {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LibraryPageDto {
    #[serde(default)]
    families: Vec<FamilyRefDto>,
    #[serde(default)]
    pagination: Option<PaginationDto>,
}

#[derive(Debug, Deserialize)]
struct FamilyRefDto {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaginationDto {
    #[serde(default)]
    page_count: Option<u32>,
    #[serde(default)]
    count: Option<u32>,
    #[serde(default)]
    per_page: Option<u32>,
}

/// Family detail as returned by `families/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct FamilyDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub web_link: Option<String>,
    #[serde(default)]
    classification: Option<OneOrMany>,
    #[serde(default)]
    browse_info: Option<BrowseInfoDto>,
    #[serde(default)]
    foundry: Option<FoundryDto>,
    #[serde(default)]
    pub css_stack: Option<String>,
    #[serde(default)]
    pub css_names: Option<Vec<String>>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    variations: Vec<VariationDto>,
    #[serde(default, alias = "modified_at")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn first(&self) -> Option<&str> {
        match self {
            OneOrMany::One(s) => Some(s.as_str()),
            OneOrMany::Many(v) => v.first().map(String::as_str),
        }
        .map(str::trim)
        .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct BrowseInfoDto {
    #[serde(default)]
    classification: Option<OneOrMany>,
    #[serde(default)]
    language: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FoundryDto {
    Plain(String),
    Named { name: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariationDto {
    Fvd(String),
    Detailed {
        #[serde(default)]
        fvd: Option<String>,
        #[serde(default)]
        font_style: Option<String>,
        #[serde(default)]
        font_weight: Option<WeightDto>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WeightDto {
    Number(u16),
    Text(String),
}

impl VariationDto {
    fn to_variation(&self) -> Option<Variation> {
        match self {
            VariationDto::Fvd(fvd) => Variation::from_fvd(fvd),
            VariationDto::Detailed {
                fvd,
                font_style,
                font_weight,
            } => {
                if let Some(v) = fvd.as_deref().and_then(Variation::from_fvd) {
                    return Some(v);
                }
                let weight = match font_weight.as_ref()? {
                    WeightDto::Number(n) => *n,
                    WeightDto::Text(s) => s.trim().parse().ok()?,
                };
                if !(100..=900).contains(&weight) {
                    return None;
                }
                let style = font_style
                    .as_deref()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "normal".to_string());
                Some(Variation { style, weight })
            }
        }
    }
}

/// Unwrap `{"<key>": {...}}` envelopes; bare bodies pass through.
fn unwrap_envelope(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

/// Map a `libraries` response.
pub fn libraries_from_value(value: Value) -> Result<Vec<LibrarySummary>, CatalogApiError> {
    let response: LibrariesResponse = serde_json::from_value(value).map_err(|e| {
        CatalogApiError::ParseError(format!("Failed to parse libraries response: {}", e))
    })?;

    Ok(response
        .libraries
        .into_iter()
        .filter_map(|l| {
            let id = l.id?.trim().to_string();
            if id.is_empty() {
                return None;
            }
            let name = l.name.unwrap_or_else(|| id.clone());
            Some(LibrarySummary { id, name })
        })
        .collect())
}

/// Map a `libraries/{id}` page response.
///
/// Without pagination info the page count is inferred: a short page is
/// the last one, a full page means at least one more may follow.
pub fn library_page_from_value(
    value: Value,
    library_id: &str,
    page: u32,
    page_size: u32,
) -> Result<LibraryPage, CatalogApiError> {
    let dto: LibraryPageDto = serde_json::from_value(unwrap_envelope(value, "library"))
        .map_err(|e| {
            CatalogApiError::ParseError(format!(
                "Failed to parse page {} of library {}: {}",
                page, library_id, e
            ))
        })?;

    // Inference below looks at the raw page length, before entries without
    // an id or name are dropped.
    let listed = dto.families.len() as u32;
    let families: Vec<FamilyRef> = dto
        .families
        .into_iter()
        .filter_map(|f| {
            let id = f.id?.trim().to_string();
            let name = f.name?.trim().to_string();
            if id.is_empty() || name.is_empty() {
                return None;
            }
            Some(FamilyRef { id, name })
        })
        .collect();

    let page_count = match &dto.pagination {
        Some(PaginationDto {
            page_count: Some(count),
            ..
        }) => *count,
        Some(PaginationDto {
            count: Some(total),
            per_page,
            ..
        }) => {
            let per_page = per_page.unwrap_or(page_size).max(1);
            total.div_ceil(per_page)
        }
        _ if listed >= page_size && page_size > 0 => page + 1,
        _ => page,
    };

    Ok(LibraryPage {
        library_id: library_id.to_string(),
        page,
        page_count,
        families,
    })
}

/// Map a `families/{id}` response.
pub fn family_from_value(value: Value, requested_id: &str) -> Result<FontFamily, CatalogApiError> {
    let dto: FamilyDto = serde_json::from_value(unwrap_envelope(value, "family")).map_err(|e| {
        CatalogApiError::ParseError(format!("Failed to parse family {}: {}", requested_id, e))
    })?;
    dto.into_family(requested_id)
}

impl FamilyDto {
    /// Fold alternates into the canonical record.
    pub fn into_family(self, requested_id: &str) -> Result<FontFamily, CatalogApiError> {
        let id = self
            .id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| requested_id.to_string());

        let name = self
            .name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CatalogApiError::ParseError(format!("Family {} has no name", id)))?;

        let slug = self
            .slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&name));

        let browse_info = self.browse_info.unwrap_or_default();
        let classification = self
            .classification
            .as_ref()
            .and_then(OneOrMany::first)
            .or_else(|| browse_info.classification.as_ref().and_then(OneOrMany::first))
            .unwrap_or_default()
            .to_string();

        let foundry = match self.foundry {
            Some(FoundryDto::Plain(s)) | Some(FoundryDto::Named { name: s }) => s.trim().to_string(),
            None => String::new(),
        };

        let css_stack = match (self.css_stack, self.css_names) {
            (Some(stack), _) if !stack.trim().is_empty() => stack.trim().to_string(),
            (_, Some(names)) => names
                .iter()
                .map(|n| format!("\"{}\"", n.trim()))
                .collect::<Vec<_>>()
                .join(","),
            _ => String::new(),
        };

        let mut languages = self
            .languages
            .or(browse_info.language)
            .unwrap_or_default();
        languages.retain(|l| !l.trim().is_empty());

        let variations = self
            .variations
            .iter()
            .filter_map(VariationDto::to_variation)
            .collect();

        Ok(FontFamily {
            id,
            slug,
            name,
            description: self.description.unwrap_or_default().trim().to_string(),
            web_link: self.web_link.filter(|s| !s.trim().is_empty()),
            classification,
            foundry,
            css_stack,
            languages,
            variations,
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_libraries_skip_entries_without_id() {
        let libs = libraries_from_value(json!({
            "libraries": [
                {"id": "full", "name": "Full Library"},
                {"name": "nameless"},
                {"id": "trial"}
            ]
        }))
        .unwrap();

        assert_eq!(libs.len(), 2);
        assert_eq!(libs[0].id, "full");
        assert_eq!(libs[1].name, "trial");
    }

    #[test]
    fn test_library_page_with_pagination() {
        let page = library_page_from_value(
            json!({
                "library": {
                    "id": "full",
                    "families": [{"id": "gkmg", "name": "Droid Sans"}],
                    "pagination": {"count": 250, "on": 1, "page": 1, "page_count": 3, "per_page": 100}
                }
            }),
            "full",
            1,
            100,
        )
        .unwrap();

        assert_eq!(page.page_count, 3);
        assert_eq!(page.families[0].id, "gkmg");
    }

    #[test]
    fn test_library_page_count_from_total() {
        let page = library_page_from_value(
            json!({"families": [], "pagination": {"count": 201, "per_page": 100}}),
            "full",
            1,
            100,
        )
        .unwrap();
        assert_eq!(page.page_count, 3);
    }

    #[test]
    fn test_library_page_count_inferred() {
        let short = library_page_from_value(
            json!({"families": [{"id": "a", "name": "A"}]}),
            "full",
            2,
            10,
        )
        .unwrap();
        assert_eq!(short.page_count, 2);

        let full = library_page_from_value(
            json!({"families": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}]}),
            "full",
            1,
            2,
        )
        .unwrap();
        assert_eq!(full.page_count, 2);
        assert_eq!(full.families[1].name, "B");
    }

    #[test]
    fn test_library_page_drops_entries_without_id_or_name() {
        let page = library_page_from_value(
            json!({"families": [
                {"name": "No Id"},
                {"id": "  ", "name": "Blank Id"},
                {"id": "nameless"},
                {"id": "gkmg", "name": " Droid Sans "}
            ]}),
            "full",
            1,
            4,
        )
        .unwrap();

        assert_eq!(page.families.len(), 1);
        assert_eq!(page.families[0].id, "gkmg");
        assert_eq!(page.families[0].name, "Droid Sans");
        // A full raw page still implies another one may follow.
        assert_eq!(page.page_count, 2);
    }

    #[test]
    fn test_family_canonical_shape() {
        let family = family_from_value(
            json!({
                "family": {
                    "id": "gkmg",
                    "slug": "droid-sans",
                    "name": "Droid Sans",
                    "description": " Humanist sans. ",
                    "web_link": "https://typekit.com/fonts/droid-sans",
                    "classification": "sans-serif",
                    "foundry": {"name": "Ascender", "slug": "ascender"},
                    "css_stack": "\"droid-sans-1\",\"droid-sans-2\",sans-serif",
                    "languages": ["en", "de"],
                    "variations": ["n4", "n7"],
                    "updated_at": "2024-03-01T12:00:00Z"
                }
            }),
            "gkmg",
        )
        .unwrap();

        assert_eq!(family.description, "Humanist sans.");
        assert_eq!(family.foundry, "Ascender");
        assert_eq!(family.classification, "sans-serif");
        assert_eq!(family.variations.len(), 2);
        assert_eq!(family.css_name(), "droid-sans-1");
        assert!(family.updated_at.is_some());
    }

    #[test]
    fn test_family_alternate_shapes() {
        let family = family_from_value(
            json!({
                "name": "Adobe Caslon Pro",
                "browse_info": {
                    "classification": ["serif", "old-style"],
                    "language": ["en", "fr"]
                },
                "foundry": "Adobe",
                "css_names": ["adobe-caslon-pro"],
                "variations": [
                    {"font_style": "Italic", "font_weight": "600"},
                    {"fvd": "n4"},
                    {"font_weight": 1200}
                ],
                "modified_at": "2023-11-05"
            }),
            "mrkk",
        )
        .unwrap();

        assert_eq!(family.id, "mrkk");
        assert_eq!(family.slug, "adobe-caslon-pro");
        assert_eq!(family.classification, "serif");
        assert_eq!(family.languages, vec!["en", "fr"]);
        assert_eq!(family.foundry, "Adobe");
        assert_eq!(family.css_stack, "\"adobe-caslon-pro\"");
        assert_eq!(
            family.variations,
            vec![
                Variation {
                    style: "italic".to_string(),
                    weight: 600
                },
                Variation {
                    style: "normal".to_string(),
                    weight: 400
                },
            ]
        );
        assert!(family.updated_at.is_some());
    }

    #[test]
    fn test_family_without_name_is_parse_error() {
        let err = family_from_value(json!({"family": {"id": "x"}}), "x").unwrap_err();
        assert!(matches!(err, CatalogApiError::ParseError(_)));
    }
}
