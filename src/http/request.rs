//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Build the outbound request for a matched rule and chosen target
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The outbound request uses origin-form (`/path?query`) with `Host` set
//!   to the target, exactly like a client talking to the backend directly
//! - The inbound body is moved, never buffered

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request, Uri, Version};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::headers::{append_forwarded, sanitize_request_headers};
use crate::load_balancer::Target;
use crate::routing::matcher::NormalizedPath;
use crate::routing::GatewayRule;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of an inbound request, or `-` when it has none.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

/// An outbound request ready to be written to the backend connection.
#[derive(Debug)]
pub struct ForwardRequest {
    /// Absolute URL, for logs.
    pub url: String,
    pub request: Request<Body>,
}

/// Why an inbound request could not be turned into an outbound one.
#[derive(Debug, thiserror::Error)]
#[error("cannot build forward request for `{path}`: {reason}")]
pub struct ForwardBuildError {
    pub path: String,
    pub reason: String,
}

/// Rewrite an inbound request for `target` under `rule`.
///
/// The path is normalized, `strip_prefix` applied, and joined onto the
/// target's base path; the query string is carried over byte for byte.
pub fn build_forward_request(
    rule: &GatewayRule,
    target: &Target,
    request: Request<Body>,
) -> Result<ForwardRequest, ForwardBuildError> {
    let (parts, body) = request.into_parts();

    let normalized = NormalizedPath::parse(parts.uri.path());
    let path = rule.forward_path(&normalized);
    let query = parts.uri.query();
    let path_and_query = target.path_and_query(&path, query);
    let url = target.url_for(&path, query);

    let uri: Uri = path_and_query.parse().map_err(|e: axum::http::uri::InvalidUri| ForwardBuildError {
        path: path_and_query.clone(),
        reason: e.to_string(),
    })?;
    let host = HeaderValue::from_str(target.authority()).map_err(|e| ForwardBuildError {
        path: path_and_query.clone(),
        reason: e.to_string(),
    })?;

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let original_host = parts.headers.get(header::HOST).cloned();

    let mut headers = parts.headers;
    sanitize_request_headers(&mut headers);
    append_forwarded(&mut headers, client_ip, original_host);
    headers.insert(header::HOST, host);

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri;
    *outbound.version_mut() = Version::HTTP_11;
    *outbound.headers_mut() = headers;

    Ok(ForwardRequest {
        url,
        request: outbound,
    })
}
