//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger config reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup in main: config, logging, metrics, then the listener
//! - In-flight requests finish before the server returns

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{Signal, Signals};
