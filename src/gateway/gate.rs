//! The pipeline stage that decides whether a request leaves the process.
//!
//! # Responsibilities
//! - Match the request against the current route table snapshot
//! - Hand unmatched requests back untouched
//! - Select a target and run the invocation for matched ones
//! - Make sure a matched request always ends with a flushed response
//!
//! # Design Decisions
//! - One snapshot per request: a concurrent reload never changes the rule
//!   an in-flight request is served by
//! - A panic inside the invocation is contained here and answered with 502
//!   when no head was written yet

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::Instrument;

use crate::gateway::error::Outcome;
use crate::gateway::executor::InvocationExecutor;
use crate::http::pipeline::{Dispatch, Handler};
use crate::http::request::request_id;
use crate::http::sink::ResponseSink;
use crate::http::tls::BackendTls;
use crate::observability::metrics;
use crate::routing::SharedRouteTable;

/// Gateway dispatch, composed in front of the application handler.
pub struct DispatchGate {
    routes: Arc<SharedRouteTable>,
    executor: InvocationExecutor,
}

impl DispatchGate {
    pub fn new(routes: Arc<SharedRouteTable>, tls: BackendTls) -> Self {
        Self {
            routes,
            executor: InvocationExecutor::new(tls),
        }
    }

    pub fn routes(&self) -> &Arc<SharedRouteTable> {
        &self.routes
    }

    /// Forward the request if a rule matches.
    ///
    /// Returns `Continue` with the request, and nothing written, when no
    /// rule matches. Otherwise returns `Handled` with `response` flushed.
    pub async fn dispatch(&self, request: Request<Body>, response: &mut ResponseSink) -> Dispatch {
        let table = self.routes.load();
        let Some(rule) = table.match_request(&request) else {
            metrics::record_unmatched();
            return Dispatch::Continue(request);
        };

        let start = Instant::now();
        let target = rule.select_target();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let span = tracing::info_span!(
            "gateway",
            rule = %rule.name(),
            backend = %target,
            request_id = %request_id(&request),
        );

        let invocation = AssertUnwindSafe(self.executor.invoke(&rule, target, request, response))
            .catch_unwind()
            .instrument(span)
            .await;

        let status = match invocation {
            Ok(Outcome::Relayed(status)) => {
                tracing::info!(
                    rule = %rule.name(),
                    backend = %target,
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Request forwarded"
                );
                status
            }
            Ok(Outcome::Failed { status, error }) => {
                metrics::record_backend_error(rule.name(), error.kind());
                tracing::warn!(
                    rule = %rule.name(),
                    backend = %target,
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    error = %error,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Forward failed"
                );
                status
            }
            Err(_) => {
                metrics::record_backend_error(rule.name(), "panic");
                tracing::error!(rule = %rule.name(), method = %method, path = %path, "Invocation panicked");
                if !response.is_committed() {
                    let _ = response.send_error(StatusCode::BAD_GATEWAY, "gateway invocation failed");
                }
                response.status().unwrap_or(StatusCode::BAD_GATEWAY)
            }
        };

        response.flush();
        metrics::record_invocation(rule.name(), status.as_u16(), start);
        Dispatch::Handled
    }
}

impl Handler for DispatchGate {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn handle<'a>(
        &'a self,
        request: Request<Body>,
        response: &'a mut ResponseSink,
    ) -> BoxFuture<'a, Dispatch> {
        Box::pin(self.dispatch(request, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{GatewaySection, RuleConfig};
    use crate::routing::RouteTable;
    use tokio::net::TcpListener;

    fn gate(section: GatewaySection) -> DispatchGate {
        let table = RouteTable::from_config(&section).unwrap();
        let tls = BackendTls::with_roots(rustls::RootCertStore::empty()).unwrap();
        DispatchGate::new(Arc::new(SharedRouteTable::new(table)), tls)
    }

    fn section(rules: Vec<RuleConfig>) -> GatewaySection {
        GatewaySection {
            rules,
            ..GatewaySection::default()
        }
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn unmatched_request_is_not_touched() {
        let gate = gate(section(vec![RuleConfig::new(
            "api",
            "/api/*",
            vec!["http://127.0.0.1:1".into()],
        )]));
        let mut sink = ResponseSink::new();

        let dispatch = gate.dispatch(get("/home"), &mut sink).await;
        match dispatch {
            Dispatch::Continue(request) => assert_eq!(request.uri().path(), "/home"),
            Dispatch::Handled => panic!("unmatched request was handled"),
        }
        assert_eq!(sink.writes(), 0);
        assert!(!sink.is_flushed());
    }

    #[tokio::test]
    async fn disabled_gateway_matches_nothing() {
        let mut section = section(vec![RuleConfig::new(
            "all",
            "/*",
            vec!["http://127.0.0.1:1".into()],
        )]);
        section.enabled = false;
        let gate = gate(section);
        let mut sink = ResponseSink::new();

        assert!(!gate.dispatch(get("/anything"), &mut sink).await.is_handled());
        assert_eq!(sink.writes(), 0);
    }

    #[tokio::test]
    async fn failed_invocation_is_still_handled_and_flushed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gate = gate(section(vec![RuleConfig::new(
            "dead",
            "/dead/*",
            vec![format!("http://{addr}")],
        )]));
        let mut sink = ResponseSink::new();

        assert!(gate.dispatch(get("/dead/x"), &mut sink).await.is_handled());
        assert!(sink.is_flushed());
        assert_eq!(sink.writes(), 1);
        assert_eq!(sink.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn reload_is_seen_by_the_next_request() {
        let gate = gate(GatewaySection::default());
        let mut sink = ResponseSink::new();
        assert!(!gate.dispatch(get("/new/x"), &mut sink).await.is_handled());

        gate.routes()
            .reload(&section(vec![RuleConfig::new(
                "new",
                "/new/*",
                vec!["http://127.0.0.1:1".into()],
            )]))
            .unwrap();
        let mut sink = ResponseSink::new();
        assert!(gate.dispatch(get("/new/x"), &mut sink).await.is_handled());
        assert!(sink.is_flushed());
    }
}
