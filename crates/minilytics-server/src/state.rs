use std::sync::Arc;

use minilytics_core::config::Config;
use minilytics_duckdb::DuckDbBackend;

use crate::geo::GeoCache;

/// Shared application state handed to every route handler.
pub struct AppState {
    pub db: Arc<DuckDbBackend>,
    pub config: Config,
    pub geo: GeoCache,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config, geo: GeoCache) -> Self {
        Self {
            db: Arc::new(db),
            config,
            geo,
        }
    }
}
