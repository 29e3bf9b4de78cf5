//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every rule once to surface pattern/target errors
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate rule names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Disabled rules are validated too: they stay loaded and must be
//!   usable the moment they are switched on
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::load_balancer::TargetError;
use crate::routing::matcher::PatternError;
use crate::routing::RouteTable;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rule #{0} has an empty name")]
    EmptyName(usize),

    #[error("duplicate rule name `{0}`")]
    DuplicateName(String),

    #[error("rule `{rule}`: no targets configured")]
    NoTargets { rule: String },

    #[error("rule `{rule}`: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: PatternError,
    },

    #[error("rule `{rule}`: target `{target}`: {source}")]
    Target {
        rule: String,
        target: String,
        #[source]
        source: TargetError,
    },

    #[error("rule `{rule}`: {field} must be greater than zero")]
    ZeroTimeout { rule: String, field: &'static str },

    #[error("gateway.{0} must be greater than zero")]
    ZeroDefaultTimeout(&'static str),

    #[error("{field}: `{value}` is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Err(rule_errors) = RouteTable::from_config(&config.gateway) {
        errors.extend(rule_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RuleConfig;

    fn rule(name: &str, path: &str, targets: &[&str]) -> RuleConfig {
        RuleConfig::new(name, path, targets.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nope".into();
        config.gateway.rules.push(rule("empty", "/a/*", &[]));
        config.gateway.rules.push(rule("bad-path", "a", &["http://b"]));
        config.gateway.rules.push(rule("bad-target", "/c", &["ftp://b"]));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAddress { .. })));
        assert!(errors.contains(&ValidationError::NoTargets { rule: "empty".into() }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Pattern { rule, .. } if rule == "bad-path")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Target { rule, .. } if rule == "bad-target")));
    }

    #[test]
    fn disabled_rules_are_still_validated() {
        let mut config = GatewayConfig::default();
        let mut r = rule("off", "/x", &[]);
        r.enabled = false;
        config.gateway.rules.push(r);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_timeouts_and_duplicates() {
        let mut config = GatewayConfig::default();
        config.gateway.connect_timeout_ms = 0;
        let mut r = rule("dup", "/x", &["http://b"]);
        r.timeout_ms = Some(0);
        config.gateway.rules.push(r);
        config.gateway.rules.push(rule("dup", "/y", &["http://b"]));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroDefaultTimeout("connect_timeout_ms")));
        assert!(errors.contains(&ValidationError::ZeroTimeout {
            rule: "dup".into(),
            field: "timeout_ms"
        }));
        assert!(errors.contains(&ValidationError::DuplicateName("dup".into())));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());
        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
