//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Gateway switch, global timeouts and forwarding rules.
    pub gateway: GatewaySection,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// The `[gateway]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Global switch. When off, no request is ever matched.
    pub enabled: bool,

    /// Default total response budget in milliseconds.
    pub timeout_ms: u64,

    /// Default connection establishment budget in milliseconds.
    pub connect_timeout_ms: u64,

    /// Trust settings for `https` targets.
    pub tls: BackendTlsConfig,

    /// Forwarding rules, matched in the order they appear.
    pub rules: Vec<RuleConfig>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            tls: BackendTlsConfig::default(),
            rules: Vec::new(),
        }
    }
}

/// The `[gateway.tls]` table. Read once at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendTlsConfig {
    /// Trust the platform certificate store.
    pub native_roots: bool,

    /// Extra PEM roots, e.g. a private CA for internal backends.
    pub ca_file: Option<PathBuf>,
}

impl Default for BackendTlsConfig {
    fn default() -> Self {
        Self {
            native_roots: true,
            ca_file: None,
        }
    }
}

/// One `[[gateway.rules]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Rule identifier for logging/metrics.
    pub name: String,

    /// Path pattern: `/exact`, `/prefix/*`, or `/a/*/b`.
    pub path: String,

    /// Host header to match (case-insensitive, `*.example.com` allowed).
    #[serde(default)]
    pub host: Option<String>,

    /// Methods to match. Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Required query parameters. A value of `*` only requires presence.
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Backend base URIs.
    pub targets: Vec<String>,

    /// Target selection strategy.
    #[serde(default)]
    pub strategy: Strategy,

    /// Prefix removed from the path before forwarding.
    #[serde(default)]
    pub strip_prefix: Option<String>,

    /// Override for the total response budget.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Override for the connection establishment budget.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Disabled rules stay loaded but never match.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleConfig {
    /// Minimal rule forwarding `path` to `targets` with all defaults.
    pub fn new(name: impl Into<String>, path: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            host: None,
            methods: Vec::new(),
            query: BTreeMap::new(),
            targets,
            strategy: Strategy::default(),
            strip_prefix: None,
            timeout_ms: None,
            connect_timeout_ms: None,
            enabled: true,
        }
    }
}

/// Target selection strategy names accepted in config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
    FixedFirst,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
