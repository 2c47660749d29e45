use std::sync::Arc;

use policyweave_core::PointcutParameters;

use super::{Policy, PolicyProvider};

/// Uniform query surface over the configured [`PolicyProvider`].
///
/// The provider's order is the wrapping order and is passed through untouched:
/// no sorting, no deduplication.
#[derive(Clone)]
pub struct PolicySelector {
    provider: Arc<dyn PolicyProvider>,
}

impl PolicySelector {
    pub fn new(provider: Arc<dyn PolicyProvider>) -> Self {
        Self { provider }
    }

    pub fn policies_available(&self) -> bool {
        self.provider.policies_available()
    }

    pub fn select_for_source(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        let policies = self.provider.find_source_policies(pointcut);
        trace_selection("source", pointcut, &policies);
        policies
    }

    pub fn select_for_operation(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        let policies = self.provider.find_operation_policies(pointcut);
        trace_selection("operation", pointcut, &policies);
        policies
    }
}

fn trace_selection(kind: &str, pointcut: &PointcutParameters, policies: &[Arc<dyn Policy>]) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let ids: Vec<&str> = policies.iter().map(|p| p.id()).collect();
        tracing::debug!(
            kind,
            component = %pointcut.component_id(),
            location = pointcut.component().location(),
            policies = ?ids,
            "policies selected"
        );
    }
}
