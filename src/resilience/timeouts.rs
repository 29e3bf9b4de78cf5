//! Timeout enforcement.
//!
//! # Responsibilities
//! - Resolve per-rule connect/total budgets against the global defaults
//! - Carry one absolute deadline through an invocation (connect, response
//!   head and body relay all draw from it)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use tokio::time::{error::Elapsed, Instant};

use crate::config::schema::GatewaySection;

/// Resolved budgets for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Connection establishment budget.
    pub connect: Duration,
    /// Budget for the full response, body included.
    pub total: Duration,
}

impl TimeoutPolicy {
    pub fn new(connect: Duration, total: Duration) -> Self {
        Self { connect, total }
    }

    /// Rule overrides win; missing ones fall back to the `[gateway]` defaults.
    pub fn resolve(
        timeout_ms: Option<u64>,
        connect_timeout_ms: Option<u64>,
        defaults: &GatewaySection,
    ) -> Self {
        Self {
            connect: Duration::from_millis(connect_timeout_ms.unwrap_or(defaults.connect_timeout_ms)),
            total: Duration::from_millis(timeout_ms.unwrap_or(defaults.timeout_ms)),
        }
    }
}

/// An absolute point in time an invocation must finish by.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// The budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left, zero once passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Run `fut` until it completes or the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        tokio::time::timeout_at(self.at, fut).await
    }
}
