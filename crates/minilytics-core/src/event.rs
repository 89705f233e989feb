use serde::{Deserialize, Serialize};

use crate::error::ValidateError;

/// The payload the browser snippet sends to POST /api/track.
///
/// `url` is the site hostname (no scheme), `path` the page path. A missing
/// `url` or `path` fails deserialization and is rejected with 400 before
/// this struct exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPayload {
    pub url: String,
    pub path: String,
    pub referrer: Option<String>,
}

/// A payload that passed sanitization and the domain gate.
///
/// `site_url` is normalized (scheme and leading `www.` stripped) and both
/// `site_url` and `page_path` are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPageview {
    pub site_url: String,
    pub page_path: String,
    pub referrer: Option<String>,
}

/// The enriched record handed to the store. `id` and `created_at` are
/// assigned by the store at insert time.
#[derive(Debug, Clone)]
pub struct NewPageview {
    pub site_url: String,
    pub page_path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    /// Day-scoped salted digest from [`crate::visitor`]; never a raw IP.
    pub visitor_hash: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

/// Strip characters that are invalid in a URL context (the RFC 3986 set:
/// unreserved + reserved + `%`). Defense in depth against stored junk, not
/// a semantic URL check.
pub fn sanitize_url_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '-' | '.' | '_' | '~' | ':' | '/' | '?' | '#' | '[' | ']' | '@' | '!' | '$'
                        | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' | '%'
                )
        })
        .collect()
}

/// Normalize a site domain: drop an `http(s)://` scheme prefix and one
/// leading `www.`.
pub fn normalize_site(site: &str) -> String {
    let stripped = site
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    stripped.strip_prefix("www.").unwrap_or(stripped).to_string()
}

/// Validate and sanitize an inbound report against the optionally
/// configured site domain.
///
/// With a configured domain, the event site and the configured value are
/// both normalized (leading `www.` stripped) before comparison; a mismatch
/// is `DomainNotAllowed`. Without one, any site is accepted (open mode).
pub fn validate(
    payload: &TrackPayload,
    allowed_domain: Option<&str>,
) -> Result<ValidPageview, ValidateError> {
    let site_url = normalize_site(&sanitize_url_text(&payload.url));
    let page_path = sanitize_url_text(&payload.path);

    if site_url.is_empty() {
        return Err(ValidateError::MissingField("url"));
    }
    if page_path.is_empty() {
        return Err(ValidateError::MissingField("path"));
    }

    if let Some(allowed) = allowed_domain {
        if site_url != normalize_site(allowed) {
            return Err(ValidateError::DomainNotAllowed(site_url));
        }
    }

    let referrer = payload
        .referrer
        .as_deref()
        .map(sanitize_url_text)
        .filter(|r| !r.is_empty());

    Ok(ValidPageview {
        site_url,
        page_path,
        referrer,
    })
}
