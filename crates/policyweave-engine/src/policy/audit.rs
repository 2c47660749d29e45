use std::time::Instant;

use async_trait::async_trait;

use policyweave_core::{Event, Result};

use super::Policy;
use crate::chain::{OperationCall, OperationNext, SourceNext};
use crate::state::PolicyState;

const STARTED: &str = "started";

/// Logs each invocation with its elapsed time and result.
///
/// The start instant lives in the invocation's policy state, not in the policy.
pub struct AuditPolicy {
    id: String,
}

impl AuditPolicy {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    fn finish(&self, kind: &str, state: &PolicyState, result: &Result<Event>) {
        let elapsed_us = state
            .get::<Instant>(STARTED)
            .map(|t| t.elapsed().as_micros() as u64)
            .unwrap_or(0);
        match result {
            Ok(_) => tracing::info!(
                policy = %self.id,
                kind,
                execution = %state.execution().execution_id(),
                elapsed_us,
                "invocation completed"
            ),
            Err(e) => tracing::info!(
                policy = %self.id,
                kind,
                execution = %state.execution().execution_id(),
                elapsed_us,
                code = e.code().as_str(),
                "invocation failed"
            ),
        }
    }
}

#[async_trait]
impl Policy for AuditPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    async fn on_source(&self, event: Event, next: SourceNext<'_>, state: PolicyState) -> Result<Event> {
        state.put(STARTED, Instant::now());
        let result = next.run(event).await;
        self.finish("source", &state, &result);
        result
    }

    async fn on_operation(
        &self,
        call: OperationCall,
        next: OperationNext<'_>,
        state: PolicyState,
    ) -> Result<Event> {
        state.put(STARTED, Instant::now());
        let result = next.run(call).await;
        self.finish("operation", &state, &result);
        result
    }
}
