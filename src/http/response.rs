//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend body to the client frame by frame
//! - Enforce the invocation deadline while the body is still streaming
//! - Tie the backend connection's lifetime to the relayed body
//! - Build gateway-generated error responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - A failure after the head went out is surfaced as a body error, which
//!   makes the server abort the client connection instead of pretending the
//!   response completed
//! - Dropping the body (done, failed or client gone) releases the backend
//!   connection

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced while relaying a body that already started.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("backend body failed mid-stream: {0}")]
    Upstream(#[source] BoxError),
    #[error("backend body exceeded the {0:?} response budget")]
    Timeout(Duration),
}

/// Background task driving one backend connection. Aborted on drop.
#[derive(Debug)]
pub struct ConnectionTask(JoinHandle<()>);

impl ConnectionTask {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Backend body wrapper relayed to the client.
pub struct RelayBody<B> {
    inner: B,
    deadline: Pin<Box<Sleep>>,
    budget: Duration,
    rule: String,
    finished: bool,
    _connection: Option<ConnectionTask>,
}

impl<B> RelayBody<B> {
    pub fn new(
        inner: B,
        deadline: tokio::time::Instant,
        budget: Duration,
        rule: impl Into<String>,
        connection: Option<ConnectionTask>,
    ) -> Self {
        Self {
            inner,
            deadline: Box::pin(tokio::time::sleep_until(deadline)),
            budget,
            rule: rule.into(),
            finished: false,
            _connection: connection,
        }
    }
}

impl<B> HttpBody for RelayBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = RelayError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(Ok(frame))),
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                let error: BoxError = e.into();
                tracing::warn!(rule = %this.rule, error = %error, "Backend failed mid-stream; aborting client response");
                Poll::Ready(Some(Err(RelayError::Upstream(error))))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => match this.deadline.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    this.finished = true;
                    tracing::warn!(rule = %this.rule, budget = ?this.budget, "Response budget exceeded mid-stream; aborting client response");
                    Poll::Ready(Some(Err(RelayError::Timeout(this.budget))))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for RelayBody<B> {
    fn drop(&mut self) {
        if !self.finished {
            // Also hit when the body was complete but never polled to the end;
            // either way nobody is reading any more.
            tracing::debug!(rule = %self.rule, "Relay body dropped before end of stream");
        }
    }
}

/// A response written by the gateway itself.
pub fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let body = serde_json::json!({
        "error": status.canonical_reason().unwrap_or("error"),
        "status": status.as_u16(),
        "message": message,
    })
    .to_string();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
