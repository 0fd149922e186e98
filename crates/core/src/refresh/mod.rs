//! Incremental index builder.
//!
//! A refresh walks every listing page of the selected libraries, compares
//! each page's fingerprint with the stored one and only fetches full
//! details for families on changed pages (plus listed families missing
//! from the index). Everything is then committed in one transaction.
//!
//! A changed page whose details could not all be fetched keeps no
//! fingerprint, so the next refresh marks it again.
//!
//! Families are tombstoned by absence from the libraries walked in *this*
//! refresh. Refreshing a different library than last time therefore drops
//! the families only the previous library listed.

mod fingerprint;

pub use fingerprint::page_hash;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::error::FontIndexError;
use crate::index::{FontIndex, PageFingerprint, RefreshBatch};
use crate::metrics;
use crate::pool::run_bounded;
use crate::upstream::{select_libraries, CatalogApi, LibraryWalker};

/// Parameters of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Explicit library; `None` selects one automatically.
    pub library: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
    /// Concurrent detail fetches.
    pub concurrency: usize,
}

impl From<&RefreshConfig> for RefreshOptions {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            library: config.library.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            concurrency: config.concurrency,
        }
    }
}

/// Report of a completed refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResult {
    /// Families whose details were fetched and stored.
    pub fetched_count: usize,
    /// Families whose details were requested.
    pub requested_count: usize,
    pub warnings: Vec<String>,
    pub libraries: Vec<String>,
    pub pages_walked: u32,
    pub pages_changed: u32,
    pub removed_count: usize,
    pub entry_count: u64,
}

/// Run a refresh against `index`.
pub async fn refresh_index(
    api: &dyn CatalogApi,
    index: &dyn FontIndex,
    options: &RefreshOptions,
) -> Result<RefreshResult, FontIndexError> {
    let started = Instant::now();
    let result = run_refresh(api, index, options).await;

    let label = if result.is_ok() { "ok" } else { "failed" };
    metrics::REFRESH_DURATION
        .with_label_values(&[label])
        .observe(started.elapsed().as_secs_f64());

    result
}

async fn run_refresh(
    api: &dyn CatalogApi,
    index: &dyn FontIndex,
    options: &RefreshOptions,
) -> Result<RefreshResult, FontIndexError> {
    let selection = select_libraries(api, options.library.as_deref()).await?;
    let mut warnings = selection.warnings;
    let known = index.known_ids()?;

    let mut live_ids = HashSet::new();
    let mut marked = HashSet::new();
    let mut to_fetch = Vec::new();
    let mut fingerprints = Vec::new();
    // Changed pages (as indexes into `fingerprints`) each family was listed on.
    let mut changed_pages: HashMap<String, Vec<usize>> = HashMap::new();
    let mut pages_walked = 0;
    let mut pages_changed = 0;

    for library_id in &selection.library_ids {
        let stored = index.page_fingerprints(library_id)?;
        let mut walker = LibraryWalker::new(api, library_id, options.page_size, options.max_pages);

        while let Some(page) = walker.next_page().await? {
            let hash = page_hash(&page.families);
            let changed = stored.get(&page.page).is_none_or(|fp| fp.hash != hash);

            pages_walked += 1;
            if changed {
                pages_changed += 1;
                metrics::REFRESH_PAGES.with_label_values(&["changed"]).inc();
            } else {
                metrics::REFRESH_PAGES.with_label_values(&["unchanged"]).inc();
            }
            debug!(library = %library_id, page = page.page, changed, "Page fingerprint compared");

            for family in &page.families {
                live_ids.insert(family.id.clone());
                if changed {
                    changed_pages
                        .entry(family.id.clone())
                        .or_default()
                        .push(fingerprints.len());
                }
                let needed = changed || !known.contains(&family.id);
                if needed && marked.insert(family.id.clone()) {
                    to_fetch.push(family.id.clone());
                }
            }

            fingerprints.push(PageFingerprint {
                library_id: library_id.clone(),
                page: page.page,
                hash,
                entry_count: page.families.len() as u32,
                updated_at: Utc::now(),
            });
        }

        if let Some(message) = walker.truncation_warning() {
            warn!("{}", message);
            warnings.push(message);
        }
    }

    let requested_count = to_fetch.len();
    debug!(requested_count, "Fetching family details");

    let outcomes = run_bounded(to_fetch, options.concurrency, |id| async move {
        let outcome = api.get_family(&id).await;
        (id, outcome)
    })
    .await;

    let mut families = Vec::with_capacity(outcomes.len());
    let mut unsettled_pages = HashSet::new();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(mut family) => {
                metrics::DETAIL_FETCHES.with_label_values(&["ok"]).inc();
                if family.id != id {
                    debug!(requested = %id, returned = %family.id, "Family id differs from listing");
                    family.id = id;
                }
                families.push(family);
            }
            Err(e) if e.is_not_found() => {
                metrics::DETAIL_FETCHES.with_label_values(&["not_found"]).inc();
                debug!(family = %id, "Family listed but not found; skipping");
            }
            Err(e) => {
                metrics::DETAIL_FETCHES.with_label_values(&["failed"]).inc();
                let message = format!("Failed to fetch family {}: {}", id, e);
                warn!("{}", message);
                warnings.push(message);
                if let Some(pages) = changed_pages.get(&id) {
                    unsettled_pages.extend(pages.iter().copied());
                }
            }
        }
    }

    if !unsettled_pages.is_empty() {
        debug!(
            pages = unsettled_pages.len(),
            "Leaving pages with failed fetches unfingerprinted"
        );
        fingerprints = fingerprints
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !unsettled_pages.contains(i))
            .map(|(_, fp)| fp)
            .collect();
    }

    let fetched_count = families.len();
    let batch = RefreshBatch {
        families,
        live_ids,
        library_ids: selection.library_ids.clone(),
        fingerprints,
        refreshed_at: Utc::now(),
    };
    let summary = index.apply_refresh(&batch)?;

    info!(
        libraries = ?selection.library_ids,
        pages_walked,
        pages_changed,
        requested_count,
        fetched_count,
        removed = summary.removed,
        entries = summary.entry_count,
        warnings = warnings.len(),
        "Refresh complete"
    );

    Ok(RefreshResult {
        fetched_count,
        requested_count,
        warnings,
        libraries: selection.library_ids,
        pages_walked,
        pages_changed,
        removed_count: summary.removed,
        entry_count: summary.entry_count,
    })
}
