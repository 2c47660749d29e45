//! Component allowlist: compilation, matching, and the policy enforcing it.
//!
//! Rules are `namespace:name` or `namespace:*`.

use async_trait::async_trait;

use policyweave_core::{ComponentId, Event, PolicyError, Result};

use super::{rejection, Policy};
use crate::chain::{OperationCall, OperationNext, SourceNext};
use crate::state::PolicyState;

/// Compiled allowlist rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRule {
    pub namespace: String,
    pub name: Option<String>, // None => wildcard
}

pub fn compile_rules(raw: &[String]) -> Result<Vec<ComponentRule>> {
    let mut out = Vec::with_capacity(raw.len());
    for s in raw {
        // format: "namespace:name" or "namespace:*"
        let (ns, name) = s.split_once(':').ok_or_else(|| {
            PolicyError::BadRequest(format!("invalid component rule: {s} (expected namespace:name)"))
        })?;
        if ns.is_empty() || name.is_empty() {
            return Err(PolicyError::BadRequest(format!("invalid component rule: {s}")));
        }
        let name = if name == "*" { None } else { Some(name.to_string()) };
        out.push(ComponentRule { namespace: ns.to_string(), name });
    }
    Ok(out)
}

pub fn is_allowed(rules: &[ComponentRule], component: &ComponentId) -> bool {
    rules.iter().any(|r| {
        if r.namespace != component.namespace() { return false; }
        match &r.name {
            None => true,
            Some(n) => n == component.name(),
        }
    })
}

/// Lets only allowlisted components through.
///
/// Sources get a 403 rejection response; operations fail with `Rejected`.
pub struct AllowlistPolicy {
    id: String,
    rules: Vec<ComponentRule>,
}

impl AllowlistPolicy {
    pub fn new(id: impl Into<String>, rules: Vec<ComponentRule>) -> Self {
        Self { id: id.into(), rules }
    }
}

#[async_trait]
impl Policy for AllowlistPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    async fn on_source(&self, event: Event, next: SourceNext<'_>, _state: PolicyState) -> Result<Event> {
        if !is_allowed(&self.rules, next.pointcut().component_id()) {
            return Ok(rejection(event, 403, "component not allowed"));
        }
        next.run(event).await
    }

    async fn on_operation(
        &self,
        call: OperationCall,
        next: OperationNext<'_>,
        _state: PolicyState,
    ) -> Result<Event> {
        let component = next.pointcut().component_id();
        if !is_allowed(&self.rules, component) {
            return Err(PolicyError::rejected(
                &self.id,
                format!("operation {component} not allowed"),
            ));
        }
        next.run(call).await
    }
}
