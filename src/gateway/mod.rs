//! Gateway dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! host pipeline
//!     → gate.rs (snapshot route table, match)
//!         │ no match → request handed back, nothing written
//!     → rule.select_target()
//!     → executor.rs (forward, relay or answer 502/504)
//!     → response flushed, request reported handled
//! ```
//!
//! # Design Decisions
//! - The gate is constructed explicitly and owned by the pipeline; there is
//!   no global instance
//! - No backend failure escapes as an error: it becomes a response

pub mod error;
pub mod executor;
pub mod gate;

pub use error::{InvocationError, Outcome};
pub use executor::InvocationExecutor;
pub use gate::DispatchGate;
