//! Service facade over refresh, status, stats and search.
//!
//! The index is opened per operation from the configured path, so a
//! long-lived service always sees the latest committed refresh.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::FontIndexError;
use crate::family::{FamilyResult, FontFamily};
use crate::freshness::FreshnessState;
use crate::index::{FontIndex, IndexError, IndexStats, IndexStatus, SearchFilters, SqliteFontIndex};
use crate::metrics;
use crate::refresh::{refresh_index, RefreshOptions, RefreshResult};
use crate::search::{
    search_live, search_local, LiveScanOptions, SearchOptions, SearchResponse, SearchTier,
};
use crate::upstream::{select_libraries, CatalogApi, TypekitClient};

/// Mirror status as reported to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    pub exists: bool,
    pub entry_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// True unless a refresh happened within the staleness window.
    pub stale: bool,
    pub stale_after_hours: u64,
    pub state: FreshnessState,
    pub libraries: Vec<String>,
    pub path: PathBuf,
}

/// Font index service.
pub struct FontIndexService {
    config: Arc<Config>,
    api: Option<Arc<dyn CatalogApi>>,
}

impl FontIndexService {
    /// Build the service with a Typekit client when a token is configured.
    ///
    /// Without a token the service still serves status, stats and local
    /// searches; operations that need the API fail with `NotConfigured`.
    pub fn from_config(config: Arc<Config>) -> Result<Self, FontIndexError> {
        let api: Option<Arc<dyn CatalogApi>> = if config.api.token.trim().is_empty() {
            None
        } else {
            Some(Arc::new(TypekitClient::new(&config.api)?))
        };
        Ok(Self { config, api })
    }

    /// Build the service around an existing catalog client.
    pub fn with_api(config: Arc<Config>, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            config,
            api: Some(api),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn api(&self) -> Result<&dyn CatalogApi, FontIndexError> {
        self.api.as_deref().ok_or_else(|| {
            FontIndexError::NotConfigured(
                "set api.token or FONTINDEX_API__TOKEN to reach the catalog".to_string(),
            )
        })
    }

    fn open_index(&self) -> Result<SqliteFontIndex, IndexError> {
        SqliteFontIndex::new(&self.config.index.path)
    }

    /// Open the index only if its file exists.
    fn open_existing_index(&self) -> Result<Option<SqliteFontIndex>, IndexError> {
        if !self.config.index.path.exists() {
            return Ok(None);
        }
        self.open_index().map(Some)
    }

    /// Refresh options from configuration.
    pub fn default_refresh_options(&self) -> RefreshOptions {
        RefreshOptions::from(&self.config.refresh)
    }

    /// Refresh the local mirror.
    pub async fn refresh(&self, options: &RefreshOptions) -> Result<RefreshResult, FontIndexError> {
        if options.page_size == 0 || options.max_pages == 0 {
            return Err(FontIndexError::Validation(
                "page size and max pages must be positive".to_string(),
            ));
        }
        let api = self.api()?;
        let index = self.open_index()?;
        info!(
            path = %self.config.index.path.display(),
            library = ?options.library,
            "Starting refresh"
        );
        refresh_index(api, &index, options).await
    }

    /// Report mirror presence, size and freshness. Never creates the index.
    pub fn status(&self) -> Result<StatusReport, FontIndexError> {
        let status = match self.open_existing_index()? {
            Some(index) => index.status()?,
            None => IndexStatus::default(),
        };
        Ok(self.report(status, Utc::now()))
    }

    fn report(&self, status: IndexStatus, now: DateTime<Utc>) -> StatusReport {
        let hours = self.config.index.stale_after_hours;
        let state = FreshnessState::evaluate(status.last_refresh_at, now, hours);
        StatusReport {
            exists: status.exists,
            entry_count: status.entry_count,
            last_refresh_at: status.last_refresh_at,
            stale: state != FreshnessState::Fresh,
            stale_after_hours: hours,
            state,
            libraries: status.libraries,
            path: self.config.index.path.clone(),
        }
    }

    /// Index statistics with the top `limit` values per facet.
    pub fn stats(&self, limit: usize) -> Result<IndexStats, FontIndexError> {
        let index = self.open_existing_index()?.ok_or_else(|| {
            FontIndexError::NoLocalIndex(format!(
                "{} does not exist; run a refresh first",
                self.config.index.path.display()
            ))
        })?;
        Ok(index.stats(limit)?)
    }

    /// Read one family from the mirror.
    pub fn get(&self, id: &str) -> Result<FontFamily, FontIndexError> {
        let index = self.open_existing_index()?.ok_or_else(|| {
            FontIndexError::NoLocalIndex(format!(
                "{} does not exist; run a refresh first",
                self.config.index.path.display()
            ))
        })?;
        Ok(index.get(id)?)
    }

    /// Search the mirror, or the live catalog when there is none.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, FontIndexError> {
        if query.trim().is_empty() {
            return Err(FontIndexError::Validation("query must not be empty".to_string()));
        }
        if options.cache_only && options.no_cache {
            return Err(FontIndexError::Validation(
                "cache-only and no-cache are mutually exclusive".to_string(),
            ));
        }
        let limit = options.limit.unwrap_or(self.config.search.default_limit);
        if limit == 0 {
            return Err(FontIndexError::Validation("limit must be positive".to_string()));
        }

        let filters = SearchFilters::new(options.classification.as_deref(), options.language.as_deref());
        let mut warnings = Vec::new();

        if options.refresh_first {
            let refreshed = self.refresh(&self.default_refresh_options()).await?;
            warnings.extend(refreshed.warnings);
        }

        if !options.no_cache {
            match self.mirror() {
                Ok(Some((index, status))) => {
                    if self.report(status, Utc::now()).stale {
                        warnings.push(format!(
                            "Local index is older than {} hours; consider running a refresh",
                            self.config.index.stale_after_hours
                        ));
                    }
                    match search_local(&index, query, &filters, limit) {
                        Ok(local) => {
                            warnings.extend(local.warnings);
                            return Ok(self.respond(local.families, warnings, local.tier));
                        }
                        Err(e) if options.cache_only => return Err(e.into()),
                        Err(e) => {
                            warn!(error = %e, "Local search failed; falling back to live scan");
                            warnings.push(format!(
                                "Local search failed ({}); searched the live catalog instead",
                                e
                            ));
                        }
                    }
                }
                Ok(None) if options.cache_only => {
                    return Err(FontIndexError::NoLocalIndex(
                        "no refresh has been committed yet; run a refresh first".to_string(),
                    ));
                }
                Ok(None) => {}
                Err(e) if options.cache_only => {
                    return Err(FontIndexError::NoLocalIndex(e.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Local index unavailable; falling back to live scan");
                    warnings.push(format!(
                        "Local index unavailable ({}); searched the live catalog instead",
                        e
                    ));
                }
            }
        }

        let api = self.api()?;
        let selection = select_libraries(api, self.config.refresh.library.as_deref()).await?;
        warnings.extend(selection.warnings);

        let scan = LiveScanOptions {
            page_size: self.config.refresh.page_size,
            max_pages: self.config.search.max_pages,
            concurrency: self.config.refresh.concurrency,
        };
        let live = search_live(api, &selection.library_ids, query, &filters, limit, &scan).await?;
        warnings.extend(live.warnings);

        Ok(self.respond(live.families, warnings, SearchTier::Live))
    }

    /// The mirror and its status, if a refresh has been committed.
    fn mirror(&self) -> Result<Option<(SqliteFontIndex, IndexStatus)>, IndexError> {
        let Some(index) = self.open_existing_index()? else {
            return Ok(None);
        };
        let status = index.status()?;
        if !status.exists {
            return Ok(None);
        }
        Ok(Some((index, status)))
    }

    fn respond(
        &self,
        families: Vec<FontFamily>,
        warnings: Vec<String>,
        tier: SearchTier,
    ) -> SearchResponse {
        metrics::SEARCHES.with_label_values(&[tier.as_str()]).inc();
        info!(
            tier = tier.as_str(),
            results = families.len(),
            warnings = warnings.len(),
            "Search complete"
        );
        SearchResponse {
            entries: families.iter().map(FamilyResult::from).collect(),
            warnings,
            tier,
        }
    }
}
