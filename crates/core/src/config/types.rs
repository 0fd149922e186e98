use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Upstream catalog API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the JSON API (default: https://typekit.com/api/v1/json)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API token, sent as `X-Typekit-Token`.
    #[serde(default)]
    pub token: String,
    /// Per-request timeout in seconds (default: 25)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retries after the first attempt (default: 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds (default: 500)
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://typekit.com/api/v1/json".to_string()
}

fn default_timeout() -> u64 {
    25
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("fontindex/{}", env!("CARGO_PKG_VERSION"))
}

/// Local index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Hours after the last refresh before the mirror counts as stale (default: 24)
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("fontindex.db")
}

fn default_stale_after_hours() -> u64 {
    24
}

/// Refresh configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    /// Library to mirror. When unset the best visible library is chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_refresh_max_pages")]
    pub max_pages: u32,
    /// Concurrent family detail fetches (default: 4)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            library: None,
            page_size: default_page_size(),
            max_pages: default_refresh_max_pages(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_refresh_max_pages() -> u32 {
    50
}

fn default_concurrency() -> usize {
    4
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Page budget for live API scans when no local mirror exists.
    #[serde(default = "default_search_max_pages")]
    pub max_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_pages: default_search_max_pages(),
        }
    }
}

fn default_limit() -> usize {
    20
}

fn default_search_max_pages() -> u32 {
    20
}

/// Sanitized config for diagnostics output (token redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api: SanitizedApiConfig,
    pub index: IndexConfig,
    pub refresh: RefreshConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApiConfig {
    pub base_url: String,
    pub token_configured: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api: SanitizedApiConfig {
                base_url: config.api.base_url.clone(),
                token_configured: !config.api.token.is_empty(),
                timeout_secs: config.api.timeout_secs,
                max_retries: config.api.max_retries,
            },
            index: config.index.clone(),
            refresh: config.refresh.clone(),
            search: config.search.clone(),
        }
    }
}
