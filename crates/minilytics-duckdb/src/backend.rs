use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info};

use minilytics_core::event::NewPageview;

use crate::schema::{EVOLVED_COLUMNS, INIT_SQL};

/// Timestamp format used for every `created_at` parameter. Microsecond
/// precision keeps insertion order observable within a second.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// The DuckDB-backed event store.
///
/// DuckDB is single-writer: the connection sits behind an async mutex so
/// concurrent requests serialise their appends while the struct stays
/// cheap to clone and share across Axum handlers. Appends therefore get
/// sequence ids and `created_at` stamps in the same order.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) the database file at `path`.
    ///
    /// Runs the idempotent schema batch, the in-place column evolution for
    /// databases created by older versions, and the one-time `www.`
    /// normalization for rows stored before site normalization existed.
    pub fn open(path: &str) -> Result<Self> {
        let backend = Self::init(Connection::open(path)?)?;
        info!("DuckDB opened at {}", path);
        Ok(backend)
    }

    /// Open an in-memory database. Intended for tests; data is discarded
    /// on drop.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(INIT_SQL)?;
        evolve_schema_sync(&conn);
        normalize_legacy_site_urls_sync(&conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Re-run the in-place schema evolution. Safe to call repeatedly and
    /// concurrently; already-present columns are tolerated.
    pub async fn evolve_schema(&self) {
        let conn = self.conn.lock().await;
        evolve_schema_sync(&conn);
    }

    /// Re-run the legacy `www.` normalization pass.
    pub async fn normalize_legacy_site_urls(&self) {
        let conn = self.conn.lock().await;
        normalize_legacy_site_urls_sync(&conn);
    }

    /// Append one enriched pageview. The store assigns `created_at`
    /// (server-local, at insert time) and returns the sequence id, which is
    /// unique and strictly increasing in insertion order.
    pub async fn insert_pageview(&self, record: &NewPageview) -> Result<i64> {
        let conn = self.conn.lock().await;
        let created_at = Local::now().naive_local().format(TS_FORMAT).to_string();
        let mut stmt = conn.prepare(
            "INSERT INTO pageviews \
             (site_url, page_path, referrer, user_agent, visitor_hash, country, city, region, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             RETURNING id",
        )?;
        let id: i64 = stmt.query_row(
            duckdb::params![
                record.site_url,
                record.page_path,
                record.referrer,
                record.user_agent,
                record.visitor_hash,
                record.country,
                record.city,
                record.region,
                created_at,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Delete every row with `created_at` strictly before `cutoff` and
    /// return how many were removed. Callers on the dashboard path swallow
    /// the error: a failed cleanup must never fail a read.
    pub async fn prune_older_than(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let conn = self.conn.lock().await;
        let cutoff_str = cutoff.format(TS_FORMAT).to_string();
        let deleted = conn.execute(
            "DELETE FROM pageviews WHERE created_at < ?1",
            duckdb::params![cutoff_str],
        )?;
        if deleted > 0 {
            debug!(deleted, "retention prune removed old pageviews");
        }
        Ok(deleted)
    }

    /// `SELECT 1` liveness check for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the connection lock for direct queries.
    ///
    /// Intended for integration tests that seed or verify stored data.
    /// Production code uses the typed methods above.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

/// Add nullable columns that older databases may be missing. A failed
/// ALTER means the column already exists, so the error is dropped.
fn evolve_schema_sync(conn: &Connection) {
    for (name, sql_type) in EVOLVED_COLUMNS {
        let _ = conn.execute_batch(&format!("ALTER TABLE pageviews ADD COLUMN {name} {sql_type}"));
    }
}

/// Strip a leading `www.` from site URLs stored before ingestion started
/// normalizing them. Idempotent: the predicate matches nothing once every
/// row is clean.
fn normalize_legacy_site_urls_sync(conn: &Connection) {
    if let Err(e) = conn.execute_batch(
        "UPDATE pageviews SET site_url = substr(site_url, 5) WHERE site_url LIKE 'www.%'",
    ) {
        debug!(error = %e, "www normalization pass skipped");
    }
}
