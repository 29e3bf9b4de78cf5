//! Backend invocation.
//!
//! # Data Flow
//! ```text
//! inbound request + rule + target
//!     → request.rs (rewrite path/query/headers)
//!     → TCP connect, TLS for https targets,
//!       HTTP/1.1 handshake    (connect budget)   ── fail ──▶ 502
//!     → send request, body streamed as it arrives
//!     → await response head  (total budget)     ── late ──▶ 504
//!     → sanitize headers, commit head
//!     → RelayBody streams the rest under the same deadline
//! ```
//!
//! # Design Decisions
//! - One connection per invocation, owned by the relayed body; nothing is
//!   pooled and nothing outlives the request
//! - The total budget covers everything from connect to the last body byte;
//!   the connect stage gets whichever of its own budget and the remaining
//!   total is shorter
//! - Non-2xx backend answers are relayed as they are

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::gateway::error::{InvocationError, Outcome};
use crate::http::headers::sanitize_response_headers;
use crate::http::request::build_forward_request;
use crate::http::response::{ConnectionTask, RelayBody};
use crate::http::sink::ResponseSink;
use crate::http::tls::BackendTls;
use crate::load_balancer::{Scheme, Target};
use crate::resilience::Deadline;
use crate::routing::GatewayRule;

/// Executes one forward per call. Holds no per-request state between calls.
#[derive(Clone)]
pub struct InvocationExecutor {
    tls: BackendTls,
}

impl InvocationExecutor {
    pub fn new(tls: BackendTls) -> Self {
        Self { tls }
    }

    /// Forward `request` to `target` and write the result into `sink`.
    ///
    /// Always writes exactly one head: the backend's, or a gateway error.
    pub async fn invoke(
        &self,
        rule: &GatewayRule,
        target: &Target,
        request: Request<Body>,
        sink: &mut ResponseSink,
    ) -> Outcome {
        let policy = rule.timeouts();
        let deadline = Deadline::after(policy.total);

        let result = match build_forward_request(rule, target, request) {
            Ok(forward) => {
                tracing::debug!(url = %forward.url, "Forwarding request");
                self.exchange(target, forward.request, policy.connect, &deadline)
                    .await
            }
            Err(e) => Err(e.into()),
        };

        match result {
            Ok((response, connection)) => {
                let (mut parts, body) = response.into_parts();
                sanitize_response_headers(&mut parts.headers);
                let status = parts.status;
                let body = RelayBody::new(
                    body,
                    deadline.instant(),
                    deadline.budget(),
                    rule.name(),
                    Some(connection),
                );
                if let Err(e) = sink.commit(Response::from_parts(parts, Body::new(body))) {
                    tracing::error!(error = %e, "Backend response dropped");
                }
                Outcome::Relayed(status)
            }
            Err(error) => {
                let status = error.status();
                if let Err(e) = sink.send_error(status, error.client_message()) {
                    tracing::error!(error = %e, "Gateway error response dropped");
                }
                Outcome::Failed { status, error }
            }
        }
    }

    /// Connect, hand the request over and wait for the response head.
    async fn exchange(
        &self,
        target: &Target,
        request: Request<Body>,
        connect_budget: Duration,
        deadline: &Deadline,
    ) -> Result<(Response<Incoming>, ConnectionTask), InvocationError> {
        let budget = connect_budget.min(deadline.remaining());
        let (mut sender, task) = tokio::time::timeout(budget, self.connect(target))
            .await
            .map_err(|_| InvocationError::ConnectTimeout {
                target: target.to_string(),
                budget,
            })??;

        let response = deadline
            .run(sender.send_request(request))
            .await
            .map_err(|_| InvocationError::ResponseTimeout(deadline.budget()))?
            .map_err(|source| InvocationError::Upstream {
                target: target.to_string(),
                source,
            })?;
        Ok((response, task))
    }

    /// Everything up to a connection ready to carry the request.
    async fn connect(&self, target: &Target) -> Result<(SendRequest<Body>, ConnectionTask), InvocationError> {
        let stream = TcpStream::connect((target.host(), target.port()))
            .await
            .map_err(|source| InvocationError::Connect {
                target: target.to_string(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY on backend socket");
        }

        match target.scheme() {
            Scheme::Http => handshake(target, stream).await,
            Scheme::Https => {
                let stream = self
                    .tls
                    .connect(target, stream)
                    .await
                    .map_err(|source| InvocationError::Tls {
                        target: target.to_string(),
                        source,
                    })?;
                handshake(target, stream).await
            }
        }
    }
}

/// HTTP/1.1 handshake over an established stream; spawns the connection driver.
async fn handshake<S>(
    target: &Target,
    stream: S,
) -> Result<(SendRequest<Body>, ConnectionTask), InvocationError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sender, connection) = http1::handshake::<_, Body>(TokioIo::new(stream))
        .await
        .map_err(|source| InvocationError::Handshake {
            target: target.to_string(),
            source,
        })?;

    let backend = target.to_string();
    let task = ConnectionTask::new(tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(backend = %backend, error = %e, "Backend connection closed with error");
        }
    }));
    Ok((sender, task))
}
