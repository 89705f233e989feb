use std::net::IpAddr;

use chrono::{Local, NaiveDate};
use sha2::{Digest, Sha256};

/// Sentinel used when neither a forwarded-for chain nor a connection
/// address is available.
pub const FALLBACK_IP: &str = "0.0.0.0";

/// Resolve the client IP: first entry of a comma-separated
/// `X-Forwarded-For` chain if present, else the direct connection address,
/// else [`FALLBACK_IP`].
pub fn resolve_client_ip(forwarded_for: Option<&str>, remote_addr: Option<IpAddr>) -> String {
    if let Some(chain) = forwarded_for {
        if let Some(first) = chain.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    match remote_addr {
        Some(ip) => ip.to_string(),
        None => FALLBACK_IP.to_string(),
    }
}

/// Compute the visitor hash for today.
///
/// Formula: sha256(ip || local_date("%Y-%m-%d") || salt), lowercase hex.
///
/// The calendar date in the input makes the hash rotate at the server-local
/// midnight, so the same physical visitor hashes differently on different
/// days — no cross-day tracking is possible from the digest alone. The raw
/// IP is never stored.
pub fn visitor_hash(ip: &str, salt: &str) -> String {
    visitor_hash_on(ip, Local::now().date_naive(), salt)
}

/// Date-explicit variant of [`visitor_hash`].
pub fn visitor_hash_on(ip: &str, date: NaiveDate, salt: &str) -> String {
    let input = format!("{}{}{}", ip, date.format("%Y-%m-%d"), salt);
    hex::encode(Sha256::digest(input.as_bytes()))
}
