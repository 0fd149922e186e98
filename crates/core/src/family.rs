//! Canonical font family record and the normalized search result shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A font family as stored in the local index.
///
/// `id` is the upstream identifier and the only unique key; neither `slug`
/// nor `name` is guaranteed unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontFamily {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
    /// Single classification tag (e.g. "serif", "sans-serif").
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub foundry: String,
    /// CSS font-family fallback stack.
    #[serde(default)]
    pub css_stack: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One (style, weight) pair offered by a family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variation {
    /// "normal", "italic" or "oblique".
    pub style: String,
    /// CSS weight, 100..=900.
    pub weight: u16,
}

impl Variation {
    /// Parse a font variation description such as `n4` or `i7`.
    pub fn from_fvd(fvd: &str) -> Option<Self> {
        let mut chars = fvd.trim().chars();
        let style = match chars.next()? {
            'n' => "normal",
            'i' => "italic",
            'o' => "oblique",
            _ => return None,
        };
        let digit = chars.next()?.to_digit(10)?;
        if chars.next().is_some() || !(1..=9).contains(&digit) {
            return None;
        }
        Some(Self {
            style: style.to_string(),
            weight: (digit * 100) as u16,
        })
    }
}

impl FontFamily {
    /// Primary CSS family name: the first entry of the CSS stack, unquoted,
    /// falling back to the slug.
    pub fn css_name(&self) -> String {
        self.css_stack
            .split(',')
            .next()
            .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.slug.clone())
    }

    /// Case-insensitive substring match on the classification.
    pub fn matches_classification(&self, filter: &str) -> bool {
        self.classification
            .to_lowercase()
            .contains(&filter.trim().to_lowercase())
    }

    /// Case-insensitive membership in the language set.
    pub fn supports_language(&self, language: &str) -> bool {
        let language = language.trim();
        self.languages
            .iter()
            .any(|l| l.trim().eq_ignore_ascii_case(language))
    }
}

/// Normalized search result, identical for local and live searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyResult {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub css_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
    pub classification: String,
    pub foundry: String,
    pub languages: Vec<String>,
    pub weights: Vec<u16>,
    pub styles: Vec<String>,
}

impl From<&FontFamily> for FamilyResult {
    fn from(family: &FontFamily) -> Self {
        let mut weights: Vec<u16> = family.variations.iter().map(|v| v.weight).collect();
        weights.sort_unstable();
        weights.dedup();

        let mut styles: Vec<String> = family.variations.iter().map(|v| v.style.clone()).collect();
        styles.sort();
        styles.dedup();

        Self {
            id: family.id.clone(),
            slug: family.slug.clone(),
            name: family.name.clone(),
            css_name: family.css_name(),
            description: family.description.clone(),
            web_link: family.web_link.clone(),
            classification: family.classification.clone(),
            foundry: family.foundry.clone(),
            languages: family.languages.clone(),
            weights,
            styles,
        }
    }
}

impl From<FontFamily> for FamilyResult {
    fn from(family: FontFamily) -> Self {
        Self::from(&family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> FontFamily {
        FontFamily {
            id: "gkmg".to_string(),
            slug: "droid-sans".to_string(),
            name: "Droid Sans".to_string(),
            description: String::new(),
            web_link: None,
            classification: "Sans-Serif".to_string(),
            foundry: "Ascender".to_string(),
            css_stack: "\"droid-sans-1\",\"droid-sans-2\",sans-serif".to_string(),
            languages: vec!["en".to_string(), "DE".to_string()],
            variations: vec![
                Variation::from_fvd("n7").unwrap(),
                Variation::from_fvd("n4").unwrap(),
                Variation::from_fvd("i4").unwrap(),
            ],
            updated_at: None,
        }
    }

    #[test]
    fn test_variation_from_fvd() {
        assert_eq!(
            Variation::from_fvd("n4"),
            Some(Variation {
                style: "normal".to_string(),
                weight: 400
            })
        );
        assert_eq!(Variation::from_fvd("i7").unwrap().style, "italic");
        assert_eq!(Variation::from_fvd("o3").unwrap().weight, 300);
        assert_eq!(Variation::from_fvd("x4"), None);
        assert_eq!(Variation::from_fvd("n0"), None);
        assert_eq!(Variation::from_fvd("n45"), None);
        assert_eq!(Variation::from_fvd(""), None);
    }

    #[test]
    fn test_css_name_from_stack() {
        assert_eq!(family().css_name(), "droid-sans-1");

        let mut f = family();
        f.css_stack = String::new();
        assert_eq!(f.css_name(), "droid-sans");
    }

    #[test]
    fn test_filters_are_case_insensitive() {
        let f = family();
        assert!(f.matches_classification("sans-serif"));
        assert!(f.matches_classification("SERIF"));
        assert!(!f.matches_classification("script"));
        assert!(f.supports_language("de"));
        assert!(f.supports_language("EN"));
        assert!(!f.supports_language("fr"));
    }

    #[test]
    fn test_result_dedups_weights_and_styles() {
        let result = FamilyResult::from(&family());
        assert_eq!(result.weights, vec![400, 700]);
        assert_eq!(result.styles, vec!["italic".to_string(), "normal".to_string()]);
        assert_eq!(result.css_name, "droid-sans-1");
    }
}
