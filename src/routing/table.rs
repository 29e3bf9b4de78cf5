//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled rules in configuration order
//! - Look up the first enabled rule accepting a request
//! - Publish new tables atomically on reload
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - First match wins; order, not specificity, decides
//! - O(n) scan over rules (acceptable for typical rule counts)
//! - Explicit `None` rather than a silent default route

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Request;

use crate::config::schema::GatewaySection;
use crate::config::validation::ValidationError;
use crate::routing::matcher::RequestView;
use crate::routing::rule::GatewayRule;

/// The ordered set of loaded rules plus the global gateway switch.
#[derive(Debug, Default)]
pub struct RouteTable {
    enabled: bool,
    rules: Vec<Arc<GatewayRule>>,
}

impl RouteTable {
    pub fn new(enabled: bool, rules: Vec<GatewayRule>) -> Self {
        Self {
            enabled,
            rules: rules.into_iter().map(Arc::new).collect(),
        }
    }

    /// Compile the `[gateway]` section, collecting every rule error.
    pub fn from_config(section: &GatewaySection) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("timeout_ms", section.timeout_ms),
            ("connect_timeout_ms", section.connect_timeout_ms),
        ] {
            if value == 0 {
                errors.push(ValidationError::ZeroDefaultTimeout(field));
            }
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(section.rules.len());
        for (index, config) in section.rules.iter().enumerate() {
            let name = config.name.trim();
            if !name.is_empty() && !seen.insert(name.to_string()) {
                errors.push(ValidationError::DuplicateName(name.to_string()));
            }
            match GatewayRule::from_config(index, config, section) {
                Ok(rule) => rules.push(rule),
                Err(rule_errors) => errors.extend(rule_errors),
            }
        }

        if errors.is_empty() {
            Ok(Self::new(section.enabled, rules))
        } else {
            Err(errors)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &[Arc<GatewayRule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First enabled rule accepting the request, if any.
    ///
    /// With the gateway switched off no rule is looked at.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<Arc<GatewayRule>> {
        if !self.enabled || self.rules.is_empty() {
            return None;
        }
        self.match_view(&RequestView::from_request(req)).cloned()
    }

    pub fn match_view(&self, view: &RequestView) -> Option<&Arc<GatewayRule>> {
        if !self.enabled {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.is_enabled() && rule.matches(view))
    }
}

/// The route table readers share, swapped whole on reload.
#[derive(Debug)]
pub struct SharedRouteTable {
    current: ArcSwap<RouteTable>,
}

impl SharedRouteTable {
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Snapshot of the current table. Stays valid across a concurrent swap.
    pub fn load(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    pub fn store(&self, table: RouteTable) {
        self.current.store(Arc::new(table));
    }

    /// Compile and publish a new `[gateway]` section. On error the current
    /// table stays in place.
    pub fn reload(&self, section: &GatewaySection) -> Result<(), Vec<ValidationError>> {
        let table = RouteTable::from_config(section)?;
        tracing::info!(
            rules = table.len(),
            enabled = table.is_enabled(),
            "Route table swapped"
        );
        self.store(table);
        Ok(())
    }
}

impl Default for SharedRouteTable {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}
