pub mod config;
pub mod error;
pub mod family;
pub mod freshness;
pub mod http;
pub mod index;
pub mod metrics;
pub mod pool;
pub mod refresh;
pub mod search;
pub mod service;
pub mod testing;
pub mod upstream;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use error::FontIndexError;
pub use family::{FamilyResult, FontFamily, Variation};
pub use freshness::{is_stale, FreshnessState};
pub use index::{FontIndex, IndexError, IndexStats, IndexStatus, SqliteFontIndex};
pub use refresh::{refresh_index, RefreshOptions, RefreshResult};
pub use search::{SearchOptions, SearchResponse, SearchTier};
pub use service::{FontIndexService, StatusReport};
pub use upstream::{CatalogApi, CatalogApiError, TypekitClient};
