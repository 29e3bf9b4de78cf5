//! Compiled gateway rules.
//!
//! A `GatewayRule` is the runtime form of one `[[gateway.rules]]` entry: its
//! predicates are compiled, its targets parsed and its timeouts resolved, so
//! nothing on the request path can fail because of configuration.

use crate::config::schema::{GatewaySection, RuleConfig, Strategy};
use crate::config::validation::ValidationError;
use crate::load_balancer::{self, LoadBalancer, Target};
use crate::resilience::TimeoutPolicy;
use crate::routing::matcher::{
    AndMatcher, HostMatcher, Matcher, MethodMatcher, NormalizedPath, PathPattern, PatternError,
    QueryMatcher, RequestView,
};

/// One configured forwarding policy.
#[derive(Debug)]
pub struct GatewayRule {
    name: String,
    pattern: PathPattern,
    /// Path pattern plus optional host/method/query predicates.
    predicate: AndMatcher,
    targets: Vec<Target>,
    strategy: Strategy,
    /// Per-rule selector state (the round-robin cursor lives here).
    balancer: Box<dyn LoadBalancer>,
    strip_prefix: Option<NormalizedPath>,
    timeouts: TimeoutPolicy,
    enabled: bool,
}

impl GatewayRule {
    /// Compile a rule, reporting every problem with it.
    pub fn from_config(
        index: usize,
        config: &RuleConfig,
        defaults: &GatewaySection,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let name = config.name.trim().to_string();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName(index));
        }
        let pattern_error = |source: PatternError| ValidationError::Pattern {
            rule: name.clone(),
            source,
        };

        let pattern = PathPattern::parse(&config.path).map_err(pattern_error);
        let host = config
            .host
            .as_deref()
            .map(HostMatcher::parse)
            .transpose()
            .map_err(pattern_error);
        let methods = (!config.methods.is_empty())
            .then(|| MethodMatcher::parse(config.methods.as_slice()))
            .transpose()
            .map_err(pattern_error);
        let strip_prefix = config
            .strip_prefix
            .as_deref()
            .map(parse_strip_prefix)
            .transpose()
            .map_err(pattern_error);

        if config.targets.is_empty() {
            errors.push(ValidationError::NoTargets { rule: name.clone() });
        }
        let mut targets = Vec::with_capacity(config.targets.len());
        for raw in &config.targets {
            match Target::parse(raw) {
                Ok(t) => targets.push(t),
                Err(source) => errors.push(ValidationError::Target {
                    rule: name.clone(),
                    target: raw.clone(),
                    source,
                }),
            }
        }

        for (field, value) in [
            ("timeout_ms", config.timeout_ms),
            ("connect_timeout_ms", config.connect_timeout_ms),
        ] {
            if value == Some(0) {
                errors.push(ValidationError::ZeroTimeout {
                    rule: name.clone(),
                    field,
                });
            }
        }

        let (pattern, host, methods, strip_prefix) = match (pattern, host, methods, strip_prefix) {
            (Ok(p), Ok(h), Ok(m), Ok(s)) if errors.is_empty() => (p, h, m, s),
            (p, h, m, s) => {
                errors.extend(p.err());
                errors.extend(h.err());
                errors.extend(m.err());
                errors.extend(s.err());
                return Err(errors);
            }
        };

        let mut predicate = AndMatcher::new(vec![Box::new(pattern.clone())]);
        if let Some(host) = host {
            predicate.push(Box::new(host));
        }
        if let Some(methods) = methods {
            predicate.push(Box::new(methods));
        }
        if !config.query.is_empty() {
            predicate.push(Box::new(QueryMatcher::new(config.query.clone())));
        }

        Ok(Self {
            name,
            pattern,
            predicate,
            targets,
            strategy: config.strategy,
            balancer: load_balancer::for_strategy(config.strategy),
            strip_prefix,
            timeouts: TimeoutPolicy::resolve(config.timeout_ms, config.connect_timeout_ms, defaults),
            enabled: config.enabled,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn timeouts(&self) -> TimeoutPolicy {
        self.timeouts
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether this rule accepts the request. Ignores the enabled flag.
    pub fn matches(&self, req: &RequestView) -> bool {
        self.predicate.matches(req)
    }

    /// Pick the target for one invocation.
    pub fn select_target(&self) -> &Target {
        if self.targets.len() == 1 {
            return &self.targets[0];
        }
        &self.targets[self.balancer.next_index(self.targets.len()) % self.targets.len()]
    }

    /// The path sent to the backend: `strip_prefix` removed when it applies.
    pub fn forward_path(&self, path: &NormalizedPath) -> String {
        match &self.strip_prefix {
            Some(prefix) if path.starts_with(prefix) => path.render_from(prefix.len()),
            _ => path.render_from(0),
        }
    }
}

fn parse_strip_prefix(prefix: &str) -> Result<NormalizedPath, PatternError> {
    // Same syntax as an exact path pattern; wildcards make no sense here.
    let pattern = PathPattern::parse(prefix)?;
    if prefix.contains('*') {
        return Err(PatternError::MisplacedWildcard(pattern.as_str().to_string()));
    }
    Ok(NormalizedPath::parse(prefix))
}
