//! Route matching logic.
//!
//! # Responsibilities
//! - Normalize the request path once per request (dot segments, `//`)
//! - Match path patterns: exact, prefix (`/x/*`), single-segment wildcard
//! - Match host header (case-insensitive, optional `*.` suffix form)
//! - Match method set and required query parameters
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive and segment-aligned
//! - Percent-encoded dot segments are resolved before matching, so
//!   `/public/%2e%2e/admin` is matched as `/admin`
//! - No regex to guarantee O(n) matching

use std::collections::BTreeMap;
use std::fmt;

use axum::http::{Method, Request};

/// Error produced when a configured pattern cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with '/'")]
    NotAbsolute(String),
    #[error("pattern `{0}` contains an empty segment")]
    EmptySegment(String),
    #[error("pattern `{0}` uses '*' inside a segment; '*' must be a whole segment")]
    MisplacedWildcard(String),
    #[error("pattern `{0}` contains a '.' or '..' segment")]
    DotSegment(String),
    #[error("pattern `{0}` contains '?' or '#'")]
    InvalidCharacter(String),
    #[error("host pattern `{0}` is invalid")]
    InvalidHost(String),
    #[error("method `{0}` is not a valid HTTP method token")]
    InvalidMethod(String),
}

/// A request path with dot segments resolved.
///
/// Keeps both the raw (still percent-encoded) segments, used when the path is
/// forwarded, and the decoded segments, used for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    raw: Vec<String>,
    decoded: Vec<String>,
    trailing_slash: bool,
}

impl NormalizedPath {
    /// Normalize a request path. An empty path is treated as `/`.
    pub fn parse(path: &str) -> Self {
        let mut raw: Vec<String> = Vec::new();
        let mut decoded: Vec<String> = Vec::new();
        let mut trailing_slash = false;

        for piece in path.split('/') {
            trailing_slash = false;
            if piece.is_empty() {
                trailing_slash = true;
                continue;
            }
            let text = decode_segment(piece);
            match text.as_str() {
                "." => trailing_slash = true,
                ".." => {
                    raw.pop();
                    decoded.pop();
                    trailing_slash = true;
                }
                _ => {
                    raw.push(piece.to_string());
                    decoded.push(text);
                }
            }
        }

        Self {
            trailing_slash: trailing_slash && !raw.is_empty(),
            raw,
            decoded,
        }
    }

    /// Decoded segments, used for comparisons.
    pub fn segments(&self) -> &[String] {
        &self.decoded
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.decoded.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }

    /// True if `prefix` is a segment-aligned prefix of this path.
    pub fn starts_with(&self, prefix: &NormalizedPath) -> bool {
        prefix.len() <= self.len() && self.decoded[..prefix.len()] == prefix.decoded[..]
    }

    /// Render the path as forwarded, dropping the first `skip` segments.
    pub fn render_from(&self, skip: usize) -> String {
        let rest = self.raw.get(skip..).unwrap_or_default();
        if rest.is_empty() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(rest.iter().map(|s| s.len() + 1).sum::<usize>() + 1);
        for segment in rest {
            out.push('/');
            out.push_str(segment);
        }
        if self.trailing_slash {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_from(0))
    }
}

fn decode_segment(piece: &str) -> String {
    if !piece.contains('%') {
        return piece.to_string();
    }
    String::from_utf8_lossy(&urlencoding::decode_binary(piece.as_bytes())).into_owned()
}

/// The parts of an inbound request that rules look at.
///
/// Built once per request so the path is normalized a single time no matter
/// how many rules are scanned.
#[derive(Debug, Clone)]
pub struct RequestView {
    pub method: Method,
    /// Lowercased host without port.
    pub host: Option<String>,
    pub path: NormalizedPath,
    /// Raw query string, exactly as received.
    pub query: Option<String>,
}

impl RequestView {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let host = req
            .headers()
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host())
            .map(strip_port)
            .map(|h| h.to_ascii_lowercase());

        Self {
            method: req.method().clone(),
            host,
            path: NormalizedPath::parse(req.uri().path()),
            query: req.uri().query().map(str::to_string),
        }
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep through the closing bracket.
        return host.find(']').map(|end| &host[..=end]).unwrap_or(host);
    }
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestView) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    Any,
}

/// Matches the normalized request path.
///
/// `/a/b` matches exactly, `/a/*` matches `/a` and everything below it,
/// and `/a/*/c` matches exactly one segment in place of the `*`. A trailing
/// slash in the pattern is not significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
    rest: bool,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let body = pattern
            .strip_prefix('/')
            .ok_or_else(|| PatternError::NotAbsolute(pattern.to_string()))?;
        if pattern.contains(['?', '#']) {
            return Err(PatternError::InvalidCharacter(pattern.to_string()));
        }

        let body = body.strip_suffix('/').unwrap_or(body);
        let mut segments = Vec::new();
        let mut rest = false;

        if !body.is_empty() {
            let pieces: Vec<&str> = body.split('/').collect();
            let last = pieces.len() - 1;
            for (i, piece) in pieces.into_iter().enumerate() {
                match piece {
                    "" => return Err(PatternError::EmptySegment(pattern.to_string())),
                    "." | ".." => return Err(PatternError::DotSegment(pattern.to_string())),
                    "*" if i == last => rest = true,
                    "*" => segments.push(PatternSegment::Any),
                    p if p.contains('*') => {
                        return Err(PatternError::MisplacedWildcard(pattern.to_string()))
                    }
                    p => segments.push(PatternSegment::Literal(decode_segment(p))),
                }
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            rest,
        })
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern ends in a `*` and so matches a whole subtree.
    pub fn is_prefix(&self) -> bool {
        self.rest
    }

    pub fn matches_path(&self, path: &NormalizedPath) -> bool {
        let segs = path.segments();
        let len_ok = if self.rest {
            segs.len() >= self.segments.len()
        } else {
            segs.len() == self.segments.len()
        };
        len_ok
            && self.segments.iter().zip(segs).all(|(p, s)| match p {
                PatternSegment::Any => true,
                PatternSegment::Literal(lit) => lit == s,
            })
    }
}

impl Matcher for PathPattern {
    fn matches(&self, req: &RequestView) -> bool {
        self.matches_path(&req.path)
    }
}

/// Matches the Host header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    /// `api.example.com`
    Exact(String),
    /// `*.example.com`, stored as `.example.com`
    Suffix(String),
}

impl HostMatcher {
    /// Compile a host pattern. The host is normalized to lowercase.
    pub fn parse(host: &str) -> Result<Self, PatternError> {
        let lower = host.trim().to_ascii_lowercase();
        let invalid = || PatternError::InvalidHost(host.to_string());
        if lower.is_empty() || lower.contains(['/', ' ', '?', '#']) {
            return Err(invalid());
        }
        match lower.strip_prefix('*') {
            Some(suffix) if suffix.starts_with('.') && suffix.len() > 1 && !suffix.contains('*') => {
                Ok(HostMatcher::Suffix(suffix.to_string()))
            }
            Some(_) => Err(invalid()),
            None if lower.contains('*') => Err(invalid()),
            None => Ok(HostMatcher::Exact(strip_port(&lower).to_string())),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &RequestView) -> bool {
        let Some(host) = req.host.as_deref() else {
            return false;
        };
        match self {
            HostMatcher::Exact(expected) => host == expected,
            HostMatcher::Suffix(suffix) => host.len() > suffix.len() && host.ends_with(suffix.as_str()),
        }
    }
}

/// Matches one of a set of methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn parse<S: AsRef<str>>(methods: &[S]) -> Result<Self, PatternError> {
        let methods = methods
            .iter()
            .map(|m| {
                let upper = m.as_ref().trim().to_ascii_uppercase();
                Method::from_bytes(upper.as_bytes())
                    .map_err(|_| PatternError::InvalidMethod(m.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { methods })
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &RequestView) -> bool {
        self.methods.contains(&req.method)
    }
}

/// Requires query parameters to be present, optionally with a given value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatcher {
    required: BTreeMap<String, String>,
}

/// Value meaning "any value, as long as the key is present".
pub const QUERY_ANY: &str = "*";

impl QueryMatcher {
    pub fn new(required: BTreeMap<String, String>) -> Self {
        Self { required }
    }
}

impl Matcher for QueryMatcher {
    fn matches(&self, req: &RequestView) -> bool {
        let Some(query) = req.query.as_deref() else {
            return self.required.is_empty();
        };
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        self.required.iter().all(|(key, want)| {
            pairs
                .iter()
                .any(|(k, v)| k == key && (want == QUERY_ANY || v == want))
        })
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Default)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn push(&mut self, matcher: Box<dyn Matcher>) {
        self.matchers.push(matcher);
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &RequestView) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}
