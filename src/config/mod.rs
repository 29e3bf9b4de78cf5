//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, rules compiled once)
//!     → GatewayConfig (validated)
//!     → compiled into a RouteTable by the server
//!
//! On reload (file change or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the RouteTable
//!     → in-flight requests keep the snapshot they matched
//! ```
//!
//! # Design Decisions
//! - A loaded config is never patched; a reload replaces the whole table
//! - Every section defaults, so a file with only rules is a valid config
//! - serde rejects malformed TOML; validation.rs rejects rules that parse
//!   but cannot work (no targets, bad patterns, zero timeouts)

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackendTlsConfig, GatewayConfig, GatewaySection, ListenerConfig, ObservabilityConfig, RuleConfig,
    Strategy,
};
pub use validation::ValidationError;
