//! The response side of one inbound request.
//!
//! Handlers write into a `ResponseSink` instead of returning a response, so
//! the host can tell "nothing written" apart from "handled" and so a
//! committed status is never rewritten.
//!
//! # Design Decisions
//! - `Open → Committed → Flushed`; there is no way back
//! - Error responses are refused once a head was committed
//! - Flushing hands the response to the server; the body keeps streaming

use axum::body::Body;
use axum::http::{Response, StatusCode};

use crate::http::response::error_response;

/// Where a sink is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    /// Nothing written yet.
    Open,
    /// Status and headers are fixed.
    Committed,
    /// Handed over to the connection.
    Flushed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("response already committed")]
    AlreadyCommitted,
}

/// Collects the response a handler produces.
#[derive(Debug)]
pub struct ResponseSink {
    state: SinkState,
    response: Option<Response<Body>>,
    writes: usize,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self {
            state: SinkState::Open,
            response: None,
            writes: 0,
        }
    }

    /// Fix the status, headers and body stream.
    pub fn commit(&mut self, response: Response<Body>) -> Result<(), SinkError> {
        if self.state != SinkState::Open {
            return Err(SinkError::AlreadyCommitted);
        }
        self.response = Some(response);
        self.state = SinkState::Committed;
        self.writes += 1;
        Ok(())
    }

    /// Commit a gateway-generated JSON error.
    pub fn send_error(&mut self, status: StatusCode, message: &str) -> Result<(), SinkError> {
        self.commit(error_response(status, message))
    }

    pub fn flush(&mut self) {
        self.state = SinkState::Flushed;
    }

    /// True once a head was committed, flushed or not.
    pub fn is_committed(&self) -> bool {
        self.response.is_some()
    }

    pub fn is_flushed(&self) -> bool {
        self.state == SinkState::Flushed
    }

    /// Number of writes made. Zero means the sink is untouched.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Status of the committed head, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    pub fn into_response(self) -> Option<Response<Body>> {
        self.response
    }
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}
