//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host, path, query)
//!     → matcher.rs (normalize path once, build RequestView)
//!     → table.rs (scan rules in order)
//!     → rule.rs (evaluate the rule's AND-ed predicates)
//!     → Return: matched GatewayRule or None
//!
//! Route Compilation (at startup and on reload):
//!     RuleConfig[]
//!     → Compile patterns, parse targets, resolve timeouts
//!     → Freeze as immutable RouteTable
//!     → Publish through SharedRouteTable (atomic swap)
//! ```
//!
//! # Design Decisions
//! - Routes compiled up front, immutable at runtime
//! - No regex in hot path (segment comparisons only)
//! - Deterministic: same input always matches same rule
//! - First match wins (configuration order)

pub mod matcher;
pub mod rule;
pub mod table;

pub use rule::GatewayRule;
pub use table::{RouteTable, SharedRouteTable};
