//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Log lines carry rule and backend as fields, never interpolated
//! - The gateway span carries the request ID of the invocation it wraps
//! - Metrics without an installed exporter cost one no-op call

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
