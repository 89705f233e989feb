/// DuckDB initialization SQL.
///
/// Executed at every open via `Connection::execute_batch`. All statements
/// use `IF NOT EXISTS` so re-runs (and concurrent runs against the same
/// file) are safe.
///
/// `id` comes from a sequence rather than SQLite-style AUTOINCREMENT:
/// `nextval` gives unique, strictly increasing values under concurrent
/// appends. Rows are append-only; the only UPDATE ever issued is the
/// one-time `www.` normalization in the backend.
pub const INIT_SQL: &str = r#"SET memory_limit = '512MB';
SET threads = 2;

CREATE SEQUENCE IF NOT EXISTS pageviews_id_seq;

CREATE TABLE IF NOT EXISTS pageviews (
    id              BIGINT PRIMARY KEY DEFAULT nextval('pageviews_id_seq'),
    site_url        VARCHAR NOT NULL,
    page_path       VARCHAR NOT NULL,
    referrer        VARCHAR,
    user_agent      VARCHAR,
    visitor_hash    VARCHAR NOT NULL,       -- sha256(ip + date + salt), never the raw IP
    country         VARCHAR,
    city            VARCHAR,
    region          VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Time-windowed aggregates and retention pruning
CREATE INDEX IF NOT EXISTS idx_pageviews_created_at ON pageviews(created_at);
-- Top-pages breakdown
CREATE INDEX IF NOT EXISTS idx_pageviews_page_path ON pageviews(page_path);
-- Unique-visitor counting
CREATE INDEX IF NOT EXISTS idx_pageviews_visitor ON pageviews(visitor_hash);
"#;

/// Columns added after the first released schema. Databases created before
/// they existed are upgraded in place by `ALTER TABLE ADD COLUMN`; the
/// statements are tolerated failing when the column is already present.
pub const EVOLVED_COLUMNS: &[(&str, &str)] = &[("city", "VARCHAR"), ("region", "VARCHAR")];
