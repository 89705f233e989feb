use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use minilytics_core::{
    event::{self, NewPageview, TrackPayload},
    visitor,
};

use crate::{error::AppError, state::AppState};

/// Connection address, when the listener recorded one.
///
/// Yields `None` instead of rejecting when the service runs without
/// connect info (router driven directly in tests, some proxy setups);
/// the visitor hash then falls back through the X-Forwarded-For chain.
pub struct ClientAddr(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip()),
        ))
    }
}

/// `POST /api/track` — ingest one pageview.
///
/// The payload is validated and sanitized, the client IP is folded into the
/// daily visitor hash (the raw IP is never stored), and the geolocation
/// lookup enriches the record on a best-effort basis before the append.
///
/// ## Responses
/// - `200` `{ "success": true }` — stored.
/// - `400` — malformed JSON, or `url`/`path` missing or empty.
/// - `403` — the event's site does not match the configured domain.
/// - `500` — the append failed; nothing was stored.
#[tracing::instrument(skip(state, headers, addr, payload))]
pub async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    addr: ClientAddr,
    payload: Result<Json<TrackPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let valid = event::validate(&payload, state.config.site_domain.as_deref())?;

    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let client_ip = visitor::resolve_client_ip(forwarded_for, addr.0);
    let visitor_hash = visitor::visitor_hash(&client_ip, &state.config.visitor_salt);

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|ua| !ua.is_empty())
        .map(str::to_string);

    let location = state.geo.lookup(&client_ip).await;

    let record = NewPageview {
        site_url: valid.site_url,
        page_path: valid.page_path,
        referrer: valid.referrer,
        user_agent,
        visitor_hash,
        country: location.country,
        city: location.city,
        region: location.region,
    };

    state.db.insert_pageview(&record).await?;

    Ok(Json(json!({ "success": true })))
}
