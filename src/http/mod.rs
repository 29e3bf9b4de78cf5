//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → pipeline.rs (ordered handlers, first to claim wins)
//!     → [gateway: request.rs rewrites, headers.rs sanitizes, tls.rs for https targets]
//!     → response.rs (relay body, gateway errors)
//!     → sink.rs (committed + flushed response)
//!     → Send to client
//! ```

pub mod headers;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;
pub mod sink;
pub mod tls;

pub use pipeline::{Dispatch, Handler, Pipeline, RouterHandler};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
pub use sink::ResponseSink;
pub use tls::{BackendTls, TlsError};
