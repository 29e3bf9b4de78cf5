//! Invocation failures and outcomes.

use std::time::Duration;

use axum::http::StatusCode;

use crate::http::request::ForwardBuildError;

/// Why an invocation failed before a backend response head was relayed.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connect to {target} timed out after {budget:?}")]
    ConnectTimeout { target: String, budget: Duration },
    #[error("TLS handshake with {target} failed: {source}")]
    Tls {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        #[source]
        source: hyper::Error,
    },
    #[error("backend {target} failed before responding: {source}")]
    Upstream {
        target: String,
        #[source]
        source: hyper::Error,
    },
    #[error("no response head within {0:?}")]
    ResponseTimeout(Duration),
    #[error(transparent)]
    Build(#[from] ForwardBuildError),
}

impl InvocationError {
    /// Status written to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            InvocationError::ResponseTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationError::Connect { .. } => "connect",
            InvocationError::ConnectTimeout { .. } => "connect_timeout",
            InvocationError::Tls { .. } => "tls",
            InvocationError::Handshake { .. } => "handshake",
            InvocationError::Upstream { .. } => "upstream",
            InvocationError::ResponseTimeout(_) => "response_timeout",
            InvocationError::Build(_) => "build",
        }
    }

    /// Message placed in the JSON error body. Backend addresses stay in the logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            InvocationError::Connect { .. } | InvocationError::ConnectTimeout { .. } => {
                "backend unreachable"
            }
            InvocationError::Tls { .. } => "backend TLS handshake failed",
            InvocationError::Handshake { .. } | InvocationError::Upstream { .. } => {
                "backend failed to respond"
            }
            InvocationError::ResponseTimeout(_) => "backend timed out",
            InvocationError::Build(_) => "request cannot be forwarded",
        }
    }
}

/// How one invocation ended, as far as the response head is concerned.
#[derive(Debug)]
pub enum Outcome {
    /// The backend's head was relayed; the body may still be streaming.
    Relayed(StatusCode),
    /// The gateway wrote an error response instead.
    Failed {
        status: StatusCode,
        error: InvocationError,
    },
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Relayed(status) => *status,
            Outcome::Failed { status, .. } => *status,
        }
    }

    pub fn is_relayed(&self) -> bool {
        matches!(self, Outcome::Relayed(_))
    }
}
