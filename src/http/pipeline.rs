//! Host handler chain.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → handler 1 (DispatchGate)   ── Handled ──▶ response
//!         │ Continue(request)
//!     → handler 2 (application)    ── Handled ──▶ response
//!         │ Continue(request)
//!     → 404
//! ```
//!
//! # Design Decisions
//! - Handlers are trait objects in an explicit order fixed at startup
//! - `Continue` hands the request back by value, so an unhandled request
//!   reaches the next handler untouched
//! - Once a handler reports `Handled`, no further handler runs and the host
//!   does not flush a second time

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use futures_util::future::BoxFuture;
use tower::ServiceExt;

use crate::http::response::error_response;
use crate::http::sink::ResponseSink;

/// What a handler did with a request.
#[derive(Debug)]
pub enum Dispatch {
    /// A response was written; stop here.
    Handled,
    /// Not ours; the request goes on to the next handler.
    Continue(Request<Body>),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }
}

/// One stage of the host pipeline.
pub trait Handler: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn handle<'a>(
        &'a self,
        request: Request<Body>,
        response: &'a mut ResponseSink,
    ) -> BoxFuture<'a, Dispatch>;
}

/// Ordered list of handlers.
#[derive(Clone, Default)]
pub struct Pipeline {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Run the request through the handlers until one claims it.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let mut sink = ResponseSink::new();
        let mut request = request;

        for handler in &self.handlers {
            match handler.handle(request, &mut sink).await {
                Dispatch::Handled => {
                    if !sink.is_flushed() {
                        sink.flush();
                    }
                    return sink.into_response().unwrap_or_else(|| {
                        tracing::error!(handler = handler.name(), "Handler claimed request without writing a response");
                        error_response(StatusCode::INTERNAL_SERVER_ERROR, "no response written")
                    });
                }
                Dispatch::Continue(next) => request = next,
            }
        }

        tracing::debug!(path = %request.uri().path(), "No handler claimed request");
        error_response(StatusCode::NOT_FOUND, "no handler for request")
    }
}

/// The application's own routing as the last pipeline stage.
pub struct RouterHandler {
    router: Router,
}

impl RouterHandler {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl Handler for RouterHandler {
    fn name(&self) -> &'static str {
        "application"
    }

    fn handle<'a>(
        &'a self,
        request: Request<Body>,
        response: &'a mut ResponseSink,
    ) -> BoxFuture<'a, Dispatch> {
        Box::pin(async move {
            let routed = match self.router.clone().oneshot(request).await {
                Ok(routed) => routed,
                Err(never) => match never {},
            };
            if let Err(e) = response.commit(routed) {
                tracing::error!(error = %e, "Application response dropped");
            }
            response.flush();
            Dispatch::Handled
        })
    }
}
