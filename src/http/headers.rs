//! Header hygiene for the second hop.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers, including any named in `Connection`
//! - Drop framing headers so the outgoing side recomputes them
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//!
//! # Design Decisions
//! - Framing is never copied across hops: one connection's
//!   `Content-Length`/`Transfer-Encoding` says nothing about the next one
//! - X-Forwarded-For is appended to, never replaced

use std::net::IpAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Headers meaningful only for a single transport-level connection.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers and every header listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    for name in named {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Prepare inbound request headers for the backend.
///
/// `Host` and `Content-Length` are removed; the caller sets the target's
/// host and the client connection recomputes the length from the body.
pub fn sanitize_request_headers(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::HOST);
}

/// Prepare backend response headers for the client.
///
/// A backend `Content-Length` survives only when the backend did not use
/// `Transfer-Encoding`, so the two never reach the client together.
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    let had_transfer_encoding = headers.contains_key(header::TRANSFER_ENCODING);
    strip_hop_by_hop(headers);
    if had_transfer_encoding {
        headers.remove(header::CONTENT_LENGTH);
    }
}

/// Record the original client, host and scheme for the backend.
pub fn append_forwarded(headers: &mut HeaderMap, client: Option<IpAddr>, original_host: Option<HeaderValue>) {
    if let Some(ip) = client {
        let chain = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing.trim(), ip),
            _ => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    if let Some(host) = original_host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    // TLS is terminated in front of the gateway when at all; keep what it said.
    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}
