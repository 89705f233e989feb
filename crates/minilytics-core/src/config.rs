/// Retention ceiling for this plan tier. `MINILYTICS_RETENTION_MONTHS`
/// values above this are clamped, never rejected.
pub const MAX_RETENTION_MONTHS: u32 = 6;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// The single tracked site, e.g. `example.com` (no scheme, no trailing
    /// slash). `None` means open mode: events for any site are accepted.
    pub site_domain: Option<String>,
    /// Rolling retention window in months; rows older than this are pruned
    /// before every dashboard read.
    pub retention_months: u32,
    /// Secret salt mixed into the daily visitor hash.
    pub visitor_salt: String,
    /// Base URL of the geolocation service; the client IP is appended as a
    /// path segment.
    pub geo_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("MINILYTICS_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("MINILYTICS_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            site_domain: std::env::var("MINILYTICS_SITE_DOMAIN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            retention_months: std::env::var("MINILYTICS_RETENTION_MONTHS")
                .unwrap_or_else(|_| MAX_RETENTION_MONTHS.to_string())
                .parse()
                .unwrap_or(MAX_RETENTION_MONTHS)
                .clamp(1, MAX_RETENTION_MONTHS),
            visitor_salt: std::env::var("MINILYTICS_SALT")
                .unwrap_or_else(|_| "minilytics-salt".to_string()),
            geo_base_url: std::env::var("MINILYTICS_GEO_URL")
                .unwrap_or_else(|_| "https://geoip.st/json".to_string()),
        })
    }
}
