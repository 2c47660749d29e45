//! Policy layer: the policy contract, providers, selection, and built-in policies.

pub mod allowlist;
pub mod audit;
pub mod provider;
pub mod rate_limit;
pub mod selector;

use std::sync::Arc;

use async_trait::async_trait;

use policyweave_core::{Event, Message, Params, PointcutParameters, Result};

use crate::chain::{OperationCall, OperationNext, SourceNext};
use crate::state::PolicyState;

pub use allowlist::AllowlistPolicy;
pub use audit::AuditPolicy;
pub use provider::{Matcher, StaticPolicyProvider};
pub use rate_limit::RateLimitPolicy;
pub use selector::PolicySelector;

/// An enforcement unit wrapped around an invocation.
///
/// A link either forwards to `next` (exactly once, consuming it) or returns without
/// calling it, which short-circuits every later link and the terminal execution.
/// Per-invocation data belongs in `state`, never in the policy itself: one policy
/// instance serves many concurrent invocations.
///
/// Both hooks default to plain forwarding, so a policy only implements the side(s)
/// it enforces.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Stable identity; scopes this policy's state.
    fn id(&self) -> &str;

    async fn on_source(&self, event: Event, next: SourceNext<'_>, _state: PolicyState) -> Result<Event> {
        next.run(event).await
    }

    async fn on_operation(
        &self,
        call: OperationCall,
        next: OperationNext<'_>,
        _state: PolicyState,
    ) -> Result<Event> {
        next.run(call).await
    }
}

/// Source of policies for an invocation. Returned lists are in wrapping order:
/// first = outermost.
pub trait PolicyProvider: Send + Sync {
    fn find_source_policies(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>>;

    fn find_operation_policies(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>>;

    /// `false` lets the manager skip pointcut resolution entirely.
    fn policies_available(&self) -> bool {
        true
    }
}

/// Short-circuit response for a refused inbound invocation.
///
/// Replaces the message with `{status, reason}` attributes and a null payload.
pub fn rejection(event: Event, status: u16, reason: &str) -> Event {
    let mut attributes = Params::new();
    attributes.insert("status".into(), status.into());
    attributes.insert("reason".into(), reason.into());
    event.with_message(Message::with_attributes(attributes))
}

/// Provider used when none is configured: never any policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPolicyProvider;

impl PolicyProvider for NullPolicyProvider {
    fn find_source_policies(&self, _pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        Vec::new()
    }

    fn find_operation_policies(&self, _pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        Vec::new()
    }

    fn policies_available(&self) -> bool {
        false
    }
}
