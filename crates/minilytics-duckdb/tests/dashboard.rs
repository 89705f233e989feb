use chrono::{Duration, Local};

use minilytics_duckdb::DuckDbBackend;

/// One seeded pageview row. Timestamps are expressed as whole days in the
/// past so window boundaries (30-day breakdowns, "today") are unambiguous.
struct Seed<'a> {
    site: &'a str,
    path: &'a str,
    visitor: &'a str,
    referrer: Option<&'a str>,
    country: Option<&'a str>,
    city: Option<&'a str>,
    region: Option<&'a str>,
    days_ago: i64,
}

impl Default for Seed<'_> {
    fn default() -> Self {
        Seed {
            site: "example.com",
            path: "/",
            visitor: "v1",
            referrer: None,
            country: None,
            city: None,
            region: None,
            days_ago: 0,
        }
    }
}

async fn seed(db: &DuckDbBackend, s: Seed<'_>) {
    let created_at = (Local::now().naive_local() - Duration::days(s.days_ago))
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string();
    let conn = db.conn_for_test().await;
    conn.execute(
        "INSERT INTO pageviews \
         (site_url, page_path, referrer, user_agent, visitor_hash, country, city, region, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        minilytics_duckdb::duckdb::params![
            s.site,
            s.path,
            s.referrer,
            "test-agent",
            s.visitor,
            s.country,
            s.city,
            s.region,
            created_at
        ],
    )
    .expect("seed pageview");
}

async fn setup() -> DuckDbBackend {
    DuckDbBackend::open_in_memory().expect("in-memory DuckDB")
}

// ============================================================
// Totals are all-time; unique visitors count distinct hashes
// ============================================================
#[tokio::test]
async fn test_totals_and_unique_visitors() {
    let db = setup().await;
    seed(&db, Seed { path: "/a", visitor: "v1", ..Default::default() }).await;
    seed(&db, Seed { path: "/b", visitor: "v1", ..Default::default() }).await;
    seed(&db, Seed { path: "/c", visitor: "v2", days_ago: 200, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.total_pageviews, 3, "totals are not windowed");
    assert_eq!(stats.unique_visitors, 2);
}

// ============================================================
// Today counts only the current server-local calendar date
// ============================================================
#[tokio::test]
async fn test_today_pageviews_excludes_earlier_days() {
    let db = setup().await;
    seed(&db, Seed { path: "/today", ..Default::default() }).await;
    seed(&db, Seed { path: "/past", days_ago: 2, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.total_pageviews, 2);
    assert_eq!(stats.today_pageviews, 1);
}

// ============================================================
// Top pages: count-descending, deterministic tie-break, top-10 cap
// ============================================================
#[tokio::test]
async fn test_top_pages_ordering_and_ties() {
    let db = setup().await;
    for _ in 0..5 {
        seed(&db, Seed { path: "/a", days_ago: 1, ..Default::default() }).await;
        seed(&db, Seed { path: "/b", days_ago: 1, ..Default::default() }).await;
    }
    for _ in 0..3 {
        seed(&db, Seed { path: "/c", days_ago: 1, ..Default::default() }).await;
    }

    let stats = db.dashboard_stats(None, Local::now()).await;
    let paths: Vec<&str> = stats.top_pages.iter().map(|p| p.page_path.as_str()).collect();

    // Ties sort by path, so the 5-view pair comes back in a fixed order.
    assert_eq!(paths, vec!["/a", "/b", "/c"]);
    assert_eq!(stats.top_pages[0].views, 5);
    assert_eq!(stats.top_pages[2].views, 3);
}

#[tokio::test]
async fn test_top_pages_caps_at_ten_paths() {
    let db = setup().await;
    for i in 0..12 {
        let path = format!("/page-{i:02}");
        seed(&db, Seed { path: &path, days_ago: 1, ..Default::default() }).await;
    }

    let stats = db.dashboard_stats(None, Local::now()).await;
    assert_eq!(stats.top_pages.len(), 10);
}

// ============================================================
// Breakdown window: 30 days for lists, all-time for totals
// ============================================================
#[tokio::test]
async fn test_breakdowns_are_windowed_but_totals_are_not() {
    let db = setup().await;
    seed(&db, Seed { path: "/stale", days_ago: 40, ..Default::default() }).await;
    seed(&db, Seed { path: "/live", days_ago: 5, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.total_pageviews, 2);
    let paths: Vec<&str> = stats.top_pages.iter().map(|p| p.page_path.as_str()).collect();
    assert_eq!(paths, vec!["/live"], "40-day-old rows leave the breakdowns");
}

// ============================================================
// Referrers: null and empty are excluded
// ============================================================
#[tokio::test]
async fn test_top_referrers_skip_absent_and_empty() {
    let db = setup().await;
    seed(&db, Seed { referrer: None, days_ago: 1, ..Default::default() }).await;
    seed(&db, Seed { referrer: Some(""), days_ago: 1, ..Default::default() }).await;
    seed(&db, Seed { referrer: Some("https://google.com/"), days_ago: 1, ..Default::default() }).await;
    seed(&db, Seed { referrer: Some("https://google.com/"), days_ago: 1, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.top_referrers.len(), 1);
    assert_eq!(stats.top_referrers[0].referrer, "https://google.com/");
    assert_eq!(stats.top_referrers[0].views, 2);
}

// ============================================================
// Countries and cities
// ============================================================
#[tokio::test]
async fn test_top_countries_group_known_countries() {
    let db = setup().await;
    seed(&db, Seed { country: Some("Sweden"), days_ago: 1, ..Default::default() }).await;
    seed(&db, Seed { country: Some("Sweden"), days_ago: 1, ..Default::default() }).await;
    seed(&db, Seed { country: Some("Norway"), days_ago: 1, ..Default::default() }).await;
    seed(&db, Seed { country: None, days_ago: 1, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.top_countries.len(), 2);
    assert_eq!(stats.top_countries[0].country, "Sweden");
    assert_eq!(stats.top_countries[0].views, 2);
}

#[tokio::test]
async fn test_top_cities_group_by_full_triple() {
    let db = setup().await;
    // Same city name in two different regions stays two rows.
    for _ in 0..2 {
        seed(
            &db,
            Seed {
                city: Some("Springfield"),
                region: Some("Illinois"),
                country: Some("United States"),
                days_ago: 1,
                ..Default::default()
            },
        )
        .await;
    }
    seed(
        &db,
        Seed {
            city: Some("Springfield"),
            region: Some("Missouri"),
            country: Some("United States"),
            days_ago: 1,
            ..Default::default()
        },
    )
    .await;
    seed(&db, Seed { city: None, days_ago: 1, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.top_cities.len(), 2);
    assert_eq!(stats.top_cities[0].region.as_deref(), Some("Illinois"));
    assert_eq!(stats.top_cities[0].views, 2);
    assert_eq!(stats.top_cities[1].region.as_deref(), Some("Missouri"));
    assert_eq!(stats.top_cities[1].views, 1);
}

// ============================================================
// Recent activity: newest first, capped at 20, any age
// ============================================================
#[tokio::test]
async fn test_recent_activity_newest_first_capped() {
    let db = setup().await;
    for i in 0..25 {
        let path = format!("/day-{i:02}");
        // Includes rows far older than the 30-day breakdown window.
        seed(&db, Seed { path: &path, days_ago: i * 3, ..Default::default() }).await;
    }

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.recent_activity.len(), 20);
    assert_eq!(stats.recent_activity[0].page_path, "/day-00");
    assert_eq!(stats.recent_activity[19].page_path, "/day-19");
}

// ============================================================
// Daily series: sparse, ascending
// ============================================================
#[tokio::test]
async fn test_daily_pageviews_omit_empty_days() {
    let db = setup().await;
    seed(&db, Seed { days_ago: 5, ..Default::default() }).await;
    seed(&db, Seed { days_ago: 5, ..Default::default() }).await;
    seed(&db, Seed { days_ago: 1, ..Default::default() }).await;

    let stats = db.dashboard_stats(None, Local::now()).await;

    let five_days = (Local::now().date_naive() - Duration::days(5))
        .format("%Y-%m-%d")
        .to_string();
    let one_day = (Local::now().date_naive() - Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    assert_eq!(stats.daily_pageviews.len(), 2, "zero-count days must be absent");
    assert_eq!(stats.daily_pageviews[0].date, five_days);
    assert_eq!(stats.daily_pageviews[0].views, 2);
    assert_eq!(stats.daily_pageviews[1].date, one_day);
    assert_eq!(stats.daily_pageviews[1].views, 1);
}

// ============================================================
// Site filter applies to every query
// ============================================================
#[tokio::test]
async fn test_site_filter_restricts_all_aggregates() {
    let db = setup().await;
    seed(&db, Seed { site: "example.com", path: "/mine", ..Default::default() }).await;
    seed(&db, Seed { site: "other.com", path: "/theirs", visitor: "v9", ..Default::default() }).await;

    let filtered = db.dashboard_stats(Some("example.com"), Local::now()).await;
    assert_eq!(filtered.total_pageviews, 1);
    assert_eq!(filtered.unique_visitors, 1);
    assert_eq!(filtered.recent_activity.len(), 1);
    assert_eq!(filtered.recent_activity[0].page_path, "/mine");

    let open = db.dashboard_stats(None, Local::now()).await;
    assert_eq!(open.total_pageviews, 2, "no filter means all data");
}

// ============================================================
// Aggregation failure degrades to the empty snapshot
// ============================================================
#[tokio::test]
async fn test_dashboard_degrades_to_defaults_when_queries_fail() {
    let db = setup().await;
    {
        let conn = db.conn_for_test().await;
        conn.execute_batch("DROP TABLE pageviews").expect("drop table");
    }

    let stats = db.dashboard_stats(None, Local::now()).await;

    assert_eq!(stats.total_pageviews, 0);
    assert_eq!(stats.unique_visitors, 0);
    assert_eq!(stats.today_pageviews, 0);
    assert!(stats.top_pages.is_empty());
    assert!(stats.recent_activity.is_empty());
    assert!(stats.daily_pageviews.is_empty());
}
