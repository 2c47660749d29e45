//! Static policy provider built from configuration (or by hand).

use std::sync::Arc;

use serde_json::Value;

use policyweave_core::{PointcutParameters, Result};

use super::allowlist::{compile_rules, is_allowed, ComponentRule};
use super::{AllowlistPolicy, AuditPolicy, Policy, PolicyProvider, RateLimitPolicy};
use crate::config::{AppliesTo, MatchRule, PolicyConfig, PolicyKind};

/// Compiled selection predicate.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    components: Vec<ComponentRule>,
    attributes: Vec<(String, String)>,
}

impl Matcher {
    /// Matches every invocation.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn compile(rule: &MatchRule) -> Result<Self> {
        Ok(Self {
            components: compile_rules(&rule.components)?,
            attributes: rule
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn matches(&self, pointcut: &PointcutParameters) -> bool {
        if !self.components.is_empty() && !is_allowed(&self.components, pointcut.component_id()) {
            return false;
        }
        self.attributes.iter().all(|(k, expected)| {
            let found = pointcut
                .attribute(k)
                .or_else(|| pointcut.source().and_then(|s| s.attribute(k)));
            match found {
                Some(Value::String(s)) => s == expected,
                Some(other) => other.to_string() == *expected,
                None => false,
            }
        })
    }
}

struct Binding {
    applies_to: AppliesTo,
    matcher: Matcher,
    policy: Arc<dyn Policy>,
}

/// Fixed, ordered list of policy bindings.
///
/// A lookup returns every binding whose matcher accepts the pointcut, in the order
/// they were added.
pub struct StaticPolicyProvider {
    enabled: bool,
    bindings: Vec<Binding>,
}

impl Default for StaticPolicyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPolicyProvider {
    pub fn new() -> Self {
        Self {
            enabled: true,
            bindings: Vec::new(),
        }
    }

    pub fn from_config(cfg: &PolicyConfig) -> Result<Self> {
        let mut provider = Self::new();
        provider.enabled = cfg.engine.enabled;

        for b in &cfg.policies {
            let policy: Arc<dyn Policy> = match &b.kind {
                PolicyKind::Audit => Arc::new(AuditPolicy::new(&b.id)),
                PolicyKind::RateLimit { rps, burst } => {
                    Arc::new(RateLimitPolicy::new(&b.id, *rps, *burst))
                }
                PolicyKind::Allowlist { allow } => {
                    Arc::new(AllowlistPolicy::new(&b.id, compile_rules(allow)?))
                }
            };
            provider = provider.bind(b.applies_to, Matcher::compile(&b.matcher)?, policy);
        }

        if !provider.enabled {
            tracing::warn!(bindings = provider.bindings.len(), "policy engine disabled by config");
        }
        Ok(provider)
    }

    pub fn bind(mut self, applies_to: AppliesTo, matcher: Matcher, policy: Arc<dyn Policy>) -> Self {
        self.bindings.push(Binding {
            applies_to,
            matcher,
            policy,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn find(&self, pointcut: &PointcutParameters, source: bool) -> Vec<Arc<dyn Policy>> {
        self.bindings
            .iter()
            .filter(|b| {
                if source {
                    b.applies_to.source()
                } else {
                    b.applies_to.operation()
                }
            })
            .filter(|b| b.matcher.matches(pointcut))
            .map(|b| Arc::clone(&b.policy))
            .collect()
    }
}

impl PolicyProvider for StaticPolicyProvider {
    fn find_source_policies(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        self.find(pointcut, true)
    }

    fn find_operation_policies(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        self.find(pointcut, false)
    }

    fn policies_available(&self) -> bool {
        self.enabled && !self.bindings.is_empty()
    }
}
