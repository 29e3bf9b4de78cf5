//! Backend target abstraction.
//!
//! # Responsibilities
//! - Parse and validate a configured backend base URI (`http` or `https`)
//! - Expose the pieces the executor needs: connect address, authority, base path
//! - Join a forwarded path and query onto the base URI

use std::fmt;

use url::{Host, Url};

/// Reasons a configured target is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid URI: {0}")]
    Parse(String),
    #[error("unsupported scheme `{0}`; only http and https targets are supported")]
    Scheme(String),
    #[error("missing host")]
    MissingHost,
    #[error("must not carry a query or fragment")]
    QueryOrFragment,
    #[error("must not carry credentials")]
    Credentials,
}

/// Transport used to reach a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// A single backend base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    scheme: Scheme,
    /// Host to connect to (IPv6 without brackets).
    host: String,
    port: u16,
    /// `host[:port]` as it appears in the URI, used for the Host header.
    authority: String,
    /// Base path without trailing slash; empty for the root.
    base_path: String,
}

impl Target {
    pub fn parse(uri: &str) -> Result<Self, TargetError> {
        let url = Url::parse(uri.trim()).map_err(|e| TargetError::Parse(e.to_string()))?;

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(TargetError::Scheme(other.to_string())),
        };
        if url.query().is_some() || url.fragment().is_some() {
            return Err(TargetError::QueryOrFragment);
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(TargetError::Credentials);
        }

        let (host, uri_host) = match url.host() {
            Some(Host::Domain(d)) => (d.to_string(), d.to_string()),
            Some(Host::Ipv4(addr)) => (addr.to_string(), addr.to_string()),
            Some(Host::Ipv6(addr)) => (addr.to_string(), format!("[{addr}]")),
            None => return Err(TargetError::MissingHost),
        };
        let port = url.port_or_known_default().unwrap_or(match scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        });
        let authority = match url.port() {
            Some(p) => format!("{uri_host}:{p}"),
            None => uri_host,
        };

        Ok(Self {
            scheme,
            host,
            port,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Origin-form request target: base path + `path`, then `?query` verbatim.
    pub fn path_and_query(&self, path: &str, query: Option<&str>) -> String {
        let mut out = String::with_capacity(
            self.base_path.len() + path.len() + query.map_or(0, |q| q.len() + 1),
        );
        out.push_str(&self.base_path);
        out.push_str(path);
        if let Some(q) = query {
            out.push('?');
            out.push_str(q);
        }
        out
    }

    /// Absolute URL for a forwarded path, used in logs and tests.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        format!(
            "{}://{}{}",
            self.scheme.as_str(),
            self.authority,
            self.path_and_query(path, query)
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme.as_str(), self.authority, self.base_path)
    }
}
