//! SQLite-backed font index implementation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{
    CommitSummary, CountBucket, FontIndex, IndexError, IndexStats, IndexStatus, PageFingerprint,
    RefreshBatch, SearchFilters,
};
use crate::family::{FontFamily, Variation};

const LAST_REFRESH_KEY: &str = "last_refresh_at";
const LIBRARIES_KEY: &str = "libraries";

const FAMILY_COLUMNS: &str = "f.id, f.slug, f.name, f.description, f.web_link, f.classification,
     f.foundry, f.css_stack, f.languages_json, f.variations_json, f.updated_at";

/// Shared filter clause; binds classification as ?2 and language as ?3.
const FILTER_CLAUSE: &str = "(?2 IS NULL OR instr(lower(f.classification), ?2) > 0)
     AND (?3 IS NULL OR EXISTS (
         SELECT 1 FROM json_each(f.languages_json) WHERE lower(trim(json_each.value)) = ?3))";

/// SQLite-backed font index.
pub struct SqliteFontIndex {
    conn: Mutex<Connection>,
}

impl SqliteFontIndex {
    /// Open (or create) the index file and its tables.
    pub fn new(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Unavailable(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| IndexError::Unavailable(format!("{}: {}", path.display(), e)))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory() -> Result<Self, IndexError> {
        let conn =
            Connection::open_in_memory().map_err(|e| IndexError::Unavailable(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), IndexError> {
        conn.execute_batch(
            r#"
            -- Authoritative family rows
            CREATE TABLE IF NOT EXISTS families (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                web_link TEXT,
                classification TEXT NOT NULL DEFAULT '',
                foundry TEXT NOT NULL DEFAULT '',
                css_stack TEXT NOT NULL DEFAULT '',
                languages_json TEXT NOT NULL DEFAULT '[]',
                variations_json TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_families_name ON families(name);

            -- Identity hash of each listing page seen by the last refresh
            CREATE TABLE IF NOT EXISTS page_fingerprints (
                library_id TEXT NOT NULL,
                page INTEGER NOT NULL,
                hash TEXT NOT NULL,
                entry_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (library_id, page)
            );

            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| IndexError::Database(e.to_string()))?;

        // Without FTS5 the local search tier cannot work at all.
        conn.execute_batch(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS families_fts USING fts5(
                id UNINDEXED,
                slug,
                name,
                description,
                classification,
                foundry,
                tokenize = "unicode61 tokenchars '-'"
            );
            "#,
        )
        .map_err(|e| IndexError::Unavailable(format!("full-text search: {}", e)))?;

        Ok(())
    }

    fn upsert_in(conn: &Connection, families: &[FontFamily]) -> Result<usize, IndexError> {
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO families (id, slug, name, description, web_link, classification,
                                       foundry, css_stack, languages_json, variations_json, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    slug = excluded.slug,
                    name = excluded.name,
                    description = excluded.description,
                    web_link = excluded.web_link,
                    classification = excluded.classification,
                    foundry = excluded.foundry,
                    css_stack = excluded.css_stack,
                    languages_json = excluded.languages_json,
                    variations_json = excluded.variations_json,
                    updated_at = excluded.updated_at",
            )
            .map_err(|e| IndexError::Database(e.to_string()))?;

        for family in families {
            let languages = serde_json::to_string(&family.languages)
                .map_err(|e| IndexError::Database(e.to_string()))?;
            let variations = serde_json::to_string(&family.variations)
                .map_err(|e| IndexError::Database(e.to_string()))?;

            stmt.execute(params![
                &family.id,
                &family.slug,
                &family.name,
                &family.description,
                &family.web_link,
                &family.classification,
                &family.foundry,
                &family.css_stack,
                languages,
                variations,
                family.updated_at.map(|t| t.to_rfc3339()),
            ])
            .map_err(|e| IndexError::Database(e.to_string()))?;
        }

        Ok(families.len())
    }

    fn known_ids_in(conn: &Connection) -> Result<HashSet<String>, IndexError> {
        let mut stmt = conn
            .prepare("SELECT id FROM families")
            .map_err(|e| IndexError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| IndexError::Database(e.to_string()))?;

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row.map_err(|e| IndexError::Database(e.to_string()))?);
        }
        Ok(ids)
    }

    fn delete_not_in_in(conn: &Connection, live_ids: &HashSet<String>) -> Result<usize, IndexError> {
        let stale: Vec<String> = Self::known_ids_in(conn)?
            .into_iter()
            .filter(|id| !live_ids.contains(id))
            .collect();

        let mut stmt = conn
            .prepare_cached("DELETE FROM families WHERE id = ?")
            .map_err(|e| IndexError::Database(e.to_string()))?;
        for id in &stale {
            stmt.execute(params![id])
                .map_err(|e| IndexError::Database(e.to_string()))?;
        }

        Ok(stale.len())
    }

    fn rebuild_fulltext_in(conn: &Connection) -> Result<(), IndexError> {
        conn.execute_batch(
            "DELETE FROM families_fts;
             INSERT INTO families_fts (id, slug, name, description, classification, foundry)
             SELECT id, slug, name, description, classification, foundry FROM families;",
        )
        .map_err(|e| IndexError::Database(e.to_string()))
    }

    fn count_in(conn: &Connection) -> Result<u64, IndexError> {
        conn.query_row("SELECT COUNT(*) FROM families", [], |row| row.get(0))
            .map_err(|e| IndexError::Database(e.to_string()))
    }

    fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<(), IndexError> {
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(())
    }

    fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>, IndexError> {
        conn.query_row(
            "SELECT value FROM metadata WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| IndexError::Database(e.to_string()))
    }

    fn last_refresh_in(conn: &Connection) -> Result<Option<DateTime<Utc>>, IndexError> {
        Self::get_metadata(conn, LAST_REFRESH_KEY)?
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| IndexError::Corrupt(format!("{}: {}", LAST_REFRESH_KEY, e)))
            })
            .transpose()
    }

    /// Top values of a facet column, grouped case-insensitively.
    fn top_values(
        conn: &Connection,
        column: &'static str,
        limit: usize,
    ) -> Result<Vec<CountBucket>, IndexError> {
        let sql = format!(
            "SELECT CASE WHEN trim({col}) = '' THEN 'unknown' ELSE lower(trim({col})) END AS value,
                    COUNT(*) AS n
             FROM families
             GROUP BY value
             ORDER BY n DESC, value ASC
             LIMIT ?",
            col = column
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| IndexError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(CountBucket {
                    value: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(|e| IndexError::Database(e.to_string()))?;

        let mut buckets = Vec::new();
        for row in rows {
            buckets.push(row.map_err(|e| IndexError::Database(e.to_string()))?);
        }
        Ok(buckets)
    }

    fn distinct_values(conn: &Connection, column: &'static str) -> Result<u64, IndexError> {
        let sql = format!(
            "SELECT COUNT(DISTINCT lower(trim({col}))) FROM families WHERE trim({col}) <> ''",
            col = column
        );
        conn.query_row(&sql, [], |row| row.get(0))
            .map_err(|e| IndexError::Database(e.to_string()))
    }

    fn query_families(
        conn: &Connection,
        sql: &str,
        needle: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<FontFamily>, IndexError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| IndexError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(
                params![
                    needle,
                    filters.classification.as_deref(),
                    filters.language.as_deref(),
                    limit as i64
                ],
                FamilyRow::from_row,
            )
            .map_err(|e| IndexError::Database(e.to_string()))?;

        let mut families = Vec::new();
        for row in rows {
            families.push(
                row.map_err(|e| IndexError::Database(e.to_string()))?
                    .into_family()?,
            );
        }
        Ok(families)
    }
}

/// A families row before JSON columns are decoded.
struct FamilyRow {
    id: String,
    slug: String,
    name: String,
    description: String,
    web_link: Option<String>,
    classification: String,
    foundry: String,
    css_stack: String,
    languages_json: String,
    variations_json: String,
    updated_at: Option<String>,
}

impl FamilyRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            slug: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            web_link: row.get(4)?,
            classification: row.get(5)?,
            foundry: row.get(6)?,
            css_stack: row.get(7)?,
            languages_json: row.get(8)?,
            variations_json: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_family(self) -> Result<FontFamily, IndexError> {
        let languages: Vec<String> = serde_json::from_str(&self.languages_json)
            .map_err(|e| IndexError::Corrupt(format!("{} languages: {}", self.id, e)))?;
        let variations: Vec<Variation> = serde_json::from_str(&self.variations_json)
            .map_err(|e| IndexError::Corrupt(format!("{} variations: {}", self.id, e)))?;
        let updated_at = self
            .updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(FontFamily {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            web_link: self.web_link,
            classification: self.classification,
            foundry: self.foundry,
            css_stack: self.css_stack,
            languages,
            variations,
            updated_at,
        })
    }
}

impl FontIndex for SqliteFontIndex {
    fn upsert(&self, families: &[FontFamily]) -> Result<usize, IndexError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| IndexError::Database(e.to_string()))?;
        let written = Self::upsert_in(&tx, families)?;
        tx.commit()
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(written)
    }

    fn delete_not_in(&self, live_ids: &HashSet<String>) -> Result<usize, IndexError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| IndexError::Database(e.to_string()))?;
        let removed = Self::delete_not_in_in(&tx, live_ids)?;
        tx.commit()
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(removed)
    }

    fn rebuild_fulltext(&self) -> Result<(), IndexError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Self::rebuild_fulltext_in(&tx)?;
        tx.commit()
            .map_err(|e| IndexError::Database(e.to_string()))
    }

    fn page_fingerprints(
        &self,
        library_id: &str,
    ) -> Result<HashMap<u32, PageFingerprint>, IndexError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT library_id, page, hash, entry_count, updated_at
                 FROM page_fingerprints WHERE library_id = ?",
            )
            .map_err(|e| IndexError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![library_id], |row| {
                let updated_at_str: String = row.get(4)?;
                let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                Ok(PageFingerprint {
                    library_id: row.get(0)?,
                    page: row.get(1)?,
                    hash: row.get(2)?,
                    entry_count: row.get(3)?,
                    updated_at,
                })
            })
            .map_err(|e| IndexError::Database(e.to_string()))?;

        let mut fingerprints = HashMap::new();
        for row in rows {
            let fp = row.map_err(|e| IndexError::Database(e.to_string()))?;
            fingerprints.insert(fp.page, fp);
        }
        Ok(fingerprints)
    }

    fn known_ids(&self) -> Result<HashSet<String>, IndexError> {
        let conn = self.conn.lock().unwrap();
        Self::known_ids_in(&conn)
    }

    fn apply_refresh(&self, batch: &RefreshBatch) -> Result<CommitSummary, IndexError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| IndexError::Database(e.to_string()))?;

        let upserted = Self::upsert_in(&tx, &batch.families)?;
        let removed = Self::delete_not_in_in(&tx, &batch.live_ids)?;

        for library_id in &batch.library_ids {
            tx.execute(
                "DELETE FROM page_fingerprints WHERE library_id = ?",
                params![library_id],
            )
            .map_err(|e| IndexError::Database(e.to_string()))?;
        }
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO page_fingerprints
                        (library_id, page, hash, entry_count, updated_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .map_err(|e| IndexError::Database(e.to_string()))?;
            for fp in &batch.fingerprints {
                stmt.execute(params![
                    &fp.library_id,
                    fp.page,
                    &fp.hash,
                    fp.entry_count,
                    fp.updated_at.to_rfc3339(),
                ])
                .map_err(|e| IndexError::Database(e.to_string()))?;
            }
        }

        Self::rebuild_fulltext_in(&tx)?;

        let libraries = serde_json::to_string(&batch.library_ids)
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Self::set_metadata(&tx, LAST_REFRESH_KEY, &batch.refreshed_at.to_rfc3339())?;
        Self::set_metadata(&tx, LIBRARIES_KEY, &libraries)?;

        let entry_count = Self::count_in(&tx)?;
        tx.commit()
            .map_err(|e| IndexError::Database(e.to_string()))?;

        debug!(upserted, removed, entry_count, "Refresh committed");
        Ok(CommitSummary {
            upserted,
            removed,
            entry_count,
        })
    }

    fn status(&self) -> Result<IndexStatus, IndexError> {
        let conn = self.conn.lock().unwrap();

        let last_refresh_at = Self::last_refresh_in(&conn)?;
        let libraries = match Self::get_metadata(&conn, LIBRARIES_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| IndexError::Corrupt(format!("{}: {}", LIBRARIES_KEY, e)))?,
            None => Vec::new(),
        };

        Ok(IndexStatus {
            exists: last_refresh_at.is_some(),
            entry_count: Self::count_in(&conn)?,
            last_refresh_at,
            libraries,
        })
    }

    fn stats(&self, limit: usize) -> Result<IndexStats, IndexError> {
        let conn = self.conn.lock().unwrap();

        Ok(IndexStats {
            entry_count: Self::count_in(&conn)?,
            distinct_classifications: Self::distinct_values(&conn, "classification")?,
            distinct_foundries: Self::distinct_values(&conn, "foundry")?,
            top_classifications: Self::top_values(&conn, "classification", limit)?,
            top_foundries: Self::top_values(&conn, "foundry", limit)?,
            last_refresh_at: Self::last_refresh_in(&conn)?,
        })
    }

    fn search_fulltext(
        &self,
        match_expr: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<FontFamily>, IndexError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {cols}
             FROM families_fts
             JOIN families f ON f.id = families_fts.id
             WHERE families_fts MATCH ?1
               AND {filter}
             ORDER BY bm25(families_fts), f.name
             LIMIT ?4",
            cols = FAMILY_COLUMNS,
            filter = FILTER_CLAUSE
        );
        Self::query_families(&conn, &sql, match_expr, filters, limit)
    }

    fn search_substring(
        &self,
        needle: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<FontFamily>, IndexError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {cols}
             FROM families f
             WHERE (instr(lower(f.name), ?1) > 0
                    OR instr(lower(f.slug), ?1) > 0
                    OR instr(lower(f.description), ?1) > 0)
               AND {filter}
             ORDER BY f.name ASC
             LIMIT ?4",
            cols = FAMILY_COLUMNS,
            filter = FILTER_CLAUSE
        );
        Self::query_families(&conn, &sql, &needle.trim().to_lowercase(), filters, limit)
    }

    fn get(&self, id: &str) -> Result<FontFamily, IndexError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM families f WHERE f.id = ?", FAMILY_COLUMNS);
        conn.query_row(&sql, params![id], FamilyRow::from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => IndexError::NotFound(id.to_string()),
                _ => IndexError::Database(e.to_string()),
            })?
            .into_family()
    }
}
