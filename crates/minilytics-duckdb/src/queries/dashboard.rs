//! The aggregation layer behind GET /api/stats.
//!
//! Every statistic is a set-based query over `pageviews`; nothing beyond
//! the already-limited result sets is materialised in memory. The optional
//! site filter is composed into each query as a numbered parameter
//! fragment — never interpolated as a value.
//!
//! Windows are asymmetric on purpose: totals and unique visitors are
//! all-time, the breakdowns and the daily series cover the last 30 days.

use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use duckdb::Connection;
use tracing::warn;

use minilytics_core::stats::{
    CityCount, CountryCount, DailyCount, DashboardStats, PageCount, RecentPageview, ReferrerCount,
    BREAKDOWN_WINDOW_DAYS, RECENT_LIMIT, TOP_LIMIT,
};

use crate::backend::TS_FORMAT;
use crate::DuckDbBackend;

type SqlParams = Vec<Box<dyn duckdb::types::ToSql>>;

/// Append ` AND site_url = ?N` when a site filter is configured. The
/// placeholder number is derived from the params already collected, so the
/// fragment composes onto any of the queries below.
fn push_site_filter(sql: &mut String, params: &mut SqlParams, site: Option<&str>) {
    if let Some(site) = site {
        sql.push_str(&format!(" AND site_url = ?{}", params.len() + 1));
        params.push(Box::new(site.to_string()));
    }
}

fn param_refs(params: &SqlParams) -> Vec<&dyn duckdb::types::ToSql> {
    params.iter().map(|p| p.as_ref()).collect()
}

impl DuckDbBackend {
    /// Compute the full dashboard snapshot as of `now`.
    ///
    /// Infallible by contract: each query that fails logs a warning and
    /// leaves its field at the zero/empty default, so the dashboard always
    /// renders. Nothing here is surfaced to the viewer.
    pub async fn dashboard_stats(
        &self,
        site: Option<&str>,
        now: DateTime<Local>,
    ) -> DashboardStats {
        let conn = self.conn.lock().await;
        let today = now.date_naive().format("%Y-%m-%d").to_string();
        let window_start = (now.naive_local() - Duration::days(BREAKDOWN_WINDOW_DAYS))
            .format(TS_FORMAT)
            .to_string();

        let mut stats = DashboardStats::default();

        match total_pageviews(&conn, site) {
            Ok(v) => stats.total_pageviews = v,
            Err(e) => warn!(error = %e, "total_pageviews query failed"),
        }
        match unique_visitors(&conn, site) {
            Ok(v) => stats.unique_visitors = v,
            Err(e) => warn!(error = %e, "unique_visitors query failed"),
        }
        match today_pageviews(&conn, site, &today) {
            Ok(v) => stats.today_pageviews = v,
            Err(e) => warn!(error = %e, "today_pageviews query failed"),
        }
        match top_pages(&conn, site, &window_start) {
            Ok(v) => stats.top_pages = v,
            Err(e) => warn!(error = %e, "top_pages query failed"),
        }
        match top_referrers(&conn, site, &window_start) {
            Ok(v) => stats.top_referrers = v,
            Err(e) => warn!(error = %e, "top_referrers query failed"),
        }
        match top_countries(&conn, site, &window_start) {
            Ok(v) => stats.top_countries = v,
            Err(e) => warn!(error = %e, "top_countries query failed"),
        }
        match top_cities(&conn, site, &window_start) {
            Ok(v) => stats.top_cities = v,
            Err(e) => warn!(error = %e, "top_cities query failed"),
        }
        match recent_activity(&conn, site) {
            Ok(v) => stats.recent_activity = v,
            Err(e) => warn!(error = %e, "recent_activity query failed"),
        }
        match daily_pageviews(&conn, site, &window_start) {
            Ok(v) => stats.daily_pageviews = v,
            Err(e) => warn!(error = %e, "daily_pageviews query failed"),
        }

        stats
    }
}

/// All-time pageview count.
fn total_pageviews(conn: &Connection, site: Option<&str>) -> Result<i64> {
    let mut sql = "SELECT COUNT(*) FROM pageviews WHERE 1=1".to_string();
    let mut params: SqlParams = Vec::new();
    push_site_filter(&mut sql, &mut params, site);
    let count = conn
        .prepare(&sql)?
        .query_row(param_refs(&params).as_slice(), |row| row.get(0))?;
    Ok(count)
}

/// All-time distinct visitor hashes.
fn unique_visitors(conn: &Connection, site: Option<&str>) -> Result<i64> {
    let mut sql = "SELECT COUNT(DISTINCT visitor_hash) FROM pageviews WHERE 1=1".to_string();
    let mut params: SqlParams = Vec::new();
    push_site_filter(&mut sql, &mut params, site);
    let count = conn
        .prepare(&sql)?
        .query_row(param_refs(&params).as_slice(), |row| row.get(0))?;
    Ok(count)
}

/// Rows whose calendar date equals `today` (server-local).
fn today_pageviews(conn: &Connection, site: Option<&str>, today: &str) -> Result<i64> {
    let mut sql =
        "SELECT COUNT(*) FROM pageviews WHERE CAST(created_at AS DATE) = CAST(?1 AS DATE)"
            .to_string();
    let mut params: SqlParams = vec![Box::new(today.to_string())];
    push_site_filter(&mut sql, &mut params, site);
    let count = conn
        .prepare(&sql)?
        .query_row(param_refs(&params).as_slice(), |row| row.get(0))?;
    Ok(count)
}

/// Top pages over the breakdown window. Ties are broken by path so the
/// ordering is stable and deterministic for a fixed dataset.
fn top_pages(conn: &Connection, site: Option<&str>, window_start: &str) -> Result<Vec<PageCount>> {
    let mut sql = "SELECT page_path, COUNT(*) AS views FROM pageviews \
                   WHERE created_at >= ?1"
        .to_string();
    let mut params: SqlParams = vec![Box::new(window_start.to_string())];
    push_site_filter(&mut sql, &mut params, site);
    sql.push_str(&format!(
        " GROUP BY page_path ORDER BY views DESC, page_path ASC LIMIT {TOP_LIMIT}"
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs(&params).as_slice(), |row| {
        Ok(PageCount {
            page_path: row.get(0)?,
            views: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Top referrers over the breakdown window; absent and empty referrers are
/// excluded (same-site visits never store one).
fn top_referrers(
    conn: &Connection,
    site: Option<&str>,
    window_start: &str,
) -> Result<Vec<ReferrerCount>> {
    let mut sql = "SELECT referrer, COUNT(*) AS views FROM pageviews \
                   WHERE referrer IS NOT NULL AND referrer != '' AND created_at >= ?1"
        .to_string();
    let mut params: SqlParams = vec![Box::new(window_start.to_string())];
    push_site_filter(&mut sql, &mut params, site);
    sql.push_str(&format!(
        " GROUP BY referrer ORDER BY views DESC, referrer ASC LIMIT {TOP_LIMIT}"
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs(&params).as_slice(), |row| {
        Ok(ReferrerCount {
            referrer: row.get(0)?,
            views: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn top_countries(
    conn: &Connection,
    site: Option<&str>,
    window_start: &str,
) -> Result<Vec<CountryCount>> {
    let mut sql = "SELECT country, COUNT(*) AS views FROM pageviews \
                   WHERE country IS NOT NULL AND created_at >= ?1"
        .to_string();
    let mut params: SqlParams = vec![Box::new(window_start.to_string())];
    push_site_filter(&mut sql, &mut params, site);
    sql.push_str(&format!(
        " GROUP BY country ORDER BY views DESC, country ASC LIMIT {TOP_LIMIT}"
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs(&params).as_slice(), |row| {
        Ok(CountryCount {
            country: row.get(0)?,
            views: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Grouped by the full (city, region, country) triple — the same city name
/// in two regions stays two rows. Only rows with a known city qualify.
fn top_cities(conn: &Connection, site: Option<&str>, window_start: &str) -> Result<Vec<CityCount>> {
    let mut sql = "SELECT city, region, country, COUNT(*) AS views FROM pageviews \
                   WHERE city IS NOT NULL AND created_at >= ?1"
        .to_string();
    let mut params: SqlParams = vec![Box::new(window_start.to_string())];
    push_site_filter(&mut sql, &mut params, site);
    sql.push_str(&format!(
        " GROUP BY city, region, country \
          ORDER BY views DESC, city ASC, region ASC, country ASC LIMIT {TOP_LIMIT}"
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs(&params).as_slice(), |row| {
        Ok(CityCount {
            city: row.get(0)?,
            region: row.get(1)?,
            country: row.get(2)?,
            views: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// The 20 most recent pageviews regardless of age, newest first. `id` is
/// the tie-breaker for rows sharing a timestamp.
fn recent_activity(conn: &Connection, site: Option<&str>) -> Result<Vec<RecentPageview>> {
    let mut sql = "SELECT page_path, city, region, country, \
                   strftime(created_at, '%Y-%m-%d %H:%M:%S') \
                   FROM pageviews WHERE 1=1"
        .to_string();
    let mut params: SqlParams = Vec::new();
    push_site_filter(&mut sql, &mut params, site);
    sql.push_str(&format!(
        " ORDER BY created_at DESC, id DESC LIMIT {RECENT_LIMIT}"
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs(&params).as_slice(), |row| {
        Ok(RecentPageview {
            page_path: row.get(0)?,
            city: row.get(1)?,
            region: row.get(2)?,
            country: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Per-day counts over the breakdown window, ascending. The series is
/// sparse: days with zero events produce no row at all.
fn daily_pageviews(
    conn: &Connection,
    site: Option<&str>,
    window_start: &str,
) -> Result<Vec<DailyCount>> {
    let mut sql = "SELECT strftime(CAST(created_at AS DATE), '%Y-%m-%d') AS day, \
                   COUNT(*) AS views FROM pageviews WHERE created_at >= ?1"
        .to_string();
    let mut params: SqlParams = vec![Box::new(window_start.to_string())];
    push_site_filter(&mut sql, &mut params, site);
    sql.push_str(" GROUP BY day ORDER BY day ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs(&params).as_slice(), |row| {
        Ok(DailyCount {
            date: row.get(0)?,
            views: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
