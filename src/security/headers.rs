//! Hop-by-hop header handling.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers (RFC 9110 §7.6.1) in both directions
//! - Point `Host` at the target authority for outbound requests

use axum::http::{header, HeaderMap, HeaderValue};

/// Headers that only make sense for a single transport leg.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
    for name in &listed {
        headers.remove(name.as_str());
    }
}

/// Headers for the outbound request: end-to-end headers of the inbound
/// request with `Host` replaced by the target authority.
pub fn upstream_request_headers(inbound: &HeaderMap, authority: &str) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    if let Ok(host) = HeaderValue::from_str(authority) {
        headers.insert(header::HOST, host);
    }
    headers
}
