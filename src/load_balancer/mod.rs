//! Target selection subsystem.
//!
//! # Data Flow
//! ```text
//! Rule matched → rule.targets identified
//!     → single target: returned directly, no shared state touched
//!     → otherwise apply the rule's strategy:
//!         - round_robin.rs (atomic cursor over the targets)
//!         - random.rs (uniform sample)
//!         - fixed.rs (always the first target)
//!     → target.rs (parsed backend base URI)
//! ```
//!
//! # Design Decisions
//! - Strategies pick an index, they never see the targets themselves
//! - The round-robin cursor is the only mutable shared state, one per rule
//! - No health tracking: every configured target is always eligible

pub mod fixed;
pub mod random;
pub mod round_robin;
pub mod target;

pub use target::{Scheme, Target, TargetError};

use crate::config::schema::Strategy;

/// Picks an index in `0..len` for each invocation.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// `len` is always at least 1.
    fn next_index(&self, len: usize) -> usize;
}

/// Build the selector for a configured strategy.
pub fn for_strategy(strategy: Strategy) -> Box<dyn LoadBalancer> {
    match strategy {
        Strategy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        Strategy::Random => Box::new(random::Random),
        Strategy::FixedFirst => Box::new(fixed::FixedFirst),
    }
}
