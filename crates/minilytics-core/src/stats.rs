use serde::Serialize;

/// Window for the breakdown lists and the daily series. Totals and unique
/// visitors stay all-time on purpose — the asymmetry is part of the
/// dashboard contract.
pub const BREAKDOWN_WINDOW_DAYS: i64 = 30;

/// Row cap for each top-N breakdown.
pub const TOP_LIMIT: i64 = 10;

/// Row cap for the recent-activity feed.
pub const RECENT_LIMIT: i64 = 20;

/// The dashboard's statistic set, computed as one read-only snapshot.
///
/// `Default` is the fully degraded state: every counter zero, every list
/// empty. The aggregator falls back to it field by field when a query
/// fails, so the dashboard renders instead of erroring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub total_pageviews: i64,
    pub unique_visitors: i64,
    pub today_pageviews: i64,
    pub top_pages: Vec<PageCount>,
    pub top_referrers: Vec<ReferrerCount>,
    pub top_countries: Vec<CountryCount>,
    pub top_cities: Vec<CityCount>,
    pub recent_activity: Vec<RecentPageview>,
    pub daily_pageviews: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCount {
    pub page_path: String,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub views: i64,
}

/// Grouped by the (city, region, country) triple; `city` is always present
/// in this list, the other two may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub region: Option<String>,
    pub country: Option<String>,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentPageview {
    pub page_path: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub created_at: String,
}

/// One point of the daily series. Days with zero events are absent from
/// the series, never emitted as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub views: i64,
}
