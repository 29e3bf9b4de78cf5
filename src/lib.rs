//! Gateway dispatch layer.
//!
//! Decides, per inbound request, whether it is forwarded to an external
//! backend or handed on to the application, and runs the forward when it is.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::pipeline
//!                                        │
//!                                        ├─▶ gateway::gate ──▶ routing (match)
//!                                        │        │                │
//!                                        │        │ no match       ▼
//!                                        │        ▼          load_balancer (pick)
//!                                        │   application           │
//!                                        │   (axum Router)         ▼
//!                                        │                   gateway::executor ──▶ Backend
//!                                        │                         │
//!     Client Response ◀──────────────────┴──── http::sink ◀────────┘
//!
//!     Cross-cutting: config (TOML + reload), resilience (timeouts),
//!                    observability (tracing, metrics), lifecycle (signals)
//! ```

// Core subsystems
pub mod config;
pub mod gateway;
pub mod http;
pub mod routing;

// Traffic management
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use gateway::DispatchGate;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{RouteTable, SharedRouteTable};
