//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (resolve connect/total budget, enforce one deadline)
//!     → on expiry: executor answers 504 or aborts the relay
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries and no circuit breaking: a failed invocation is answered
//!   once and forgotten, with no state carried to the next request

pub mod timeouts;

pub use timeouts::{Deadline, TimeoutPolicy};
