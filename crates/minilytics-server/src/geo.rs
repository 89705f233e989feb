//! IP geolocation via an external HTTP service, fronted by the file cache.
//!
//! Lookups are best-effort: a short timeout and an infallible API keep the
//! tracking path fast when the service is slow or down. A failed lookup
//! stores the event with empty geo fields instead of failing it.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::FileCache;

/// How long a resolved location stays valid. IP-to-city mappings drift
/// slowly, so a week of staleness is acceptable.
pub const GEO_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Hard ceiling on one remote lookup. The tracking endpoint waits for this,
/// so it has to stay well under any beacon timeout.
pub const GEO_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// What we keep from a geolocation response. All fields optional; the
/// default (all empty) is also the degraded result for failed lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

impl GeoLocation {
    fn is_empty(&self) -> bool {
        self.country.is_none() && self.city.is_none() && self.region.is_none()
    }
}

/// MaxMind-style response shape: entities carry localised name maps. Some
/// providers flatten `names` to a plain string, so both forms parse.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    country: Option<NamedEntity>,
    city: Option<NamedEntity>,
    #[serde(default)]
    subdivisions: Vec<NamedEntity>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    #[serde(default)]
    names: Option<Value>,
    #[serde(default)]
    name: Option<String>,
}

impl NamedEntity {
    /// First available localised name, else the flat `name` field. Empty
    /// strings count as absent.
    fn display_name(&self) -> Option<String> {
        match &self.names {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Object(map)) => map
                .values()
                .filter_map(Value::as_str)
                .find(|s| !s.is_empty())
                .map(str::to_string),
            _ => self.name.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Cached geolocation client. Cloning shares the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct GeoCache {
    client: reqwest::Client,
    base_url: String,
    cache: FileCache,
}

impl GeoCache {
    pub fn new(base_url: &str, cache: FileCache) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(GEO_LOOKUP_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// Resolve `ip` to a location. Cache first, then the remote service;
    /// any failure degrades to [`GeoLocation::default`]. Never errors.
    pub async fn lookup(&self, ip: &str) -> GeoLocation {
        if let Some(hit) = self.cache.get::<GeoLocation>(ip, GEO_CACHE_TTL) {
            return hit;
        }

        let location = match self.fetch(ip).await {
            Ok(location) => location,
            Err(e) => {
                debug!(error = %e, ip, "geo lookup failed, storing event without location");
                return GeoLocation::default();
            }
        };

        if !location.is_empty() {
            self.cache.put(ip, &location);
        }
        location
    }

    async fn fetch(&self, ip: &str) -> Result<GeoLocation> {
        let url = format!("{}/{}", self.base_url, ip);
        let response: GeoResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(GeoLocation {
            country: response.country.as_ref().and_then(NamedEntity::display_name),
            city: response.city.as_ref().and_then(NamedEntity::display_name),
            region: response.subdivisions.first().and_then(NamedEntity::display_name),
        })
    }
}
