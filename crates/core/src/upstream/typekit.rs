//! Typekit (Adobe Fonts) JSON API client.
//!
//! Requires an API token, sent on every request as `X-Typekit-Token`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::dto::{family_from_value, libraries_from_value, library_page_from_value};
use super::types::{LibraryPage, LibrarySummary};
use super::{CatalogApi, CatalogApiError};
use crate::config::ApiConfig;
use crate::family::FontFamily;
use crate::http::{HttpClient, HttpClientConfig, HttpError, RequestOptions};

/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "X-Typekit-Token";

/// Typekit API client.
pub struct TypekitClient {
    http: HttpClient,
}

impl TypekitClient {
    /// Create a client from the `[api]` config section.
    pub fn new(config: &ApiConfig) -> Result<Self, CatalogApiError> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(CatalogApiError::NotConfigured(
                "Typekit API token is required".to_string(),
            ));
        }

        let mut http_config = HttpClientConfig::from(config);
        http_config
            .default_headers
            .push((TOKEN_HEADER.to_string(), token.to_string()));

        Ok(Self {
            http: HttpClient::new(http_config)?,
        })
    }

    /// Wrap an already configured HTTP client.
    pub fn with_http(http: HttpClient) -> Self {
        Self { http }
    }
}

fn not_found_as(err: HttpError, what: String) -> CatalogApiError {
    match err.status() {
        Some(404) => CatalogApiError::NotFound(what),
        _ => CatalogApiError::Http(err),
    }
}

#[async_trait]
impl CatalogApi for TypekitClient {
    async fn list_libraries(&self) -> Result<Vec<LibrarySummary>, CatalogApiError> {
        debug!("Typekit list libraries");
        let value: Value = self
            .http
            .request("libraries", RequestOptions::default())
            .await?;
        libraries_from_value(value)
    }

    async fn list_library_page(
        &self,
        library_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<LibraryPage, CatalogApiError> {
        debug!(library = library_id, page, page_size, "Typekit list library page");
        let path = format!("libraries/{}", urlencoding::encode(library_id));
        let options = RequestOptions::get(&[
            ("page", page.to_string()),
            ("per_page", page_size.to_string()),
        ]);

        let value: Value = self
            .http
            .request(&path, options)
            .await
            .map_err(|e| not_found_as(e, format!("Library {}", library_id)))?;
        library_page_from_value(value, library_id, page, page_size)
    }

    async fn get_family(&self, family_id: &str) -> Result<FontFamily, CatalogApiError> {
        debug!(family = family_id, "Typekit get family");
        let path = format!("families/{}", urlencoding::encode(family_id));

        let value: Value = self
            .http
            .request(&path, RequestOptions::default())
            .await
            .map_err(|e| not_found_as(e, format!("Family {}", family_id)))?;
        family_from_value(value, family_id)
    }
}
