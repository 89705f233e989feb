use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Local, Months};
use serde_json::json;
use tracing::warn;

use minilytics_core::event::normalize_site;

use crate::state::AppState;

/// `GET /api/stats` — the full dashboard snapshot.
///
/// The rolling retention window is enforced first: rows older than the
/// configured number of months are pruned before the aggregates run, so
/// no read ever observes expired data. Both the prune and the aggregate
/// queries degrade instead of failing; the viewer always gets `200` with
/// a well-formed (possibly empty) snapshot.
#[tracing::instrument(skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Local::now();

    if let Some(cutoff) = now
        .naive_local()
        .checked_sub_months(Months::new(state.config.retention_months))
    {
        if let Err(e) = state.db.prune_older_than(cutoff).await {
            warn!(error = %e, "retention prune failed, serving stats anyway");
        }
    }

    // Ingestion stores normalized site URLs, so the filter value gets the
    // same treatment; a `www.`-prefixed config must still match.
    let site_filter = state.config.site_domain.as_deref().map(normalize_site);
    let data = state.db.dashboard_stats(site_filter.as_deref(), now).await;

    Json(json!({
        "data": data,
        "site_filter": site_filter,
    }))
}
