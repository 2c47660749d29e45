//! Operation (outbound) chains.
//!
//! No success/failure wrapping here: whatever the operation or a link returns,
//! error or not, goes back to the caller as-is.

use std::mem;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use policyweave_core::{Event, ExecutionId, Message, Params, PointcutParameters, Result};

use crate::execution::OperationExecution;
use crate::policy::Policy;
use crate::state::{ExecutionStateStore, PolicyState};
use crate::transform::OperationParametersTransformer;

/// An outbound call in flight through the chain.
///
/// Links may rewrite `parameters` (or, with a transformer, the event message);
/// the operation receives whatever reaches the end of the chain.
#[derive(Debug)]
pub struct OperationCall {
    pub event: Event,
    pub parameters: Params,
    flow_message: Option<Message>,
}

impl OperationCall {
    pub fn execution_id(&self) -> &ExecutionId {
        self.event.execution_id()
    }
}

/// Policies wrapped around an outbound operation.
pub struct CompositeOperationChain {
    policies: Vec<Arc<dyn Policy>>,
    transformer: Option<Arc<dyn OperationParametersTransformer>>,
    store: Arc<ExecutionStateStore>,
    pointcut: Arc<PointcutParameters>,
}

impl CompositeOperationChain {
    pub fn new(
        policies: Vec<Arc<dyn Policy>>,
        transformer: Option<Arc<dyn OperationParametersTransformer>>,
        store: Arc<ExecutionStateStore>,
        pointcut: Arc<PointcutParameters>,
    ) -> Self {
        Self {
            policies,
            transformer,
            store,
            pointcut,
        }
    }

    pub fn policy_ids(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.id()).collect()
    }

    pub async fn execute(
        &self,
        mut event: Event,
        parameters: Params,
        operation: &dyn OperationExecution,
    ) -> Result<Event> {
        // With a transformer, links see the call parameters as the event message;
        // the flow's own message comes back before the operation runs.
        let flow_message = self
            .transformer
            .as_ref()
            .map(|t| mem::replace(&mut event.message, t.message_from_parameters(&parameters)));

        let ctx = OperationContext {
            operation,
            transformer: self.transformer.as_deref(),
            store: &self.store,
            pointcut: &self.pointcut,
        };
        let next = OperationNext {
            links: &self.policies,
            ctx: &ctx,
        };
        next.run(OperationCall {
            event,
            parameters,
            flow_message,
        })
        .await
    }
}

struct OperationContext<'a> {
    operation: &'a dyn OperationExecution,
    transformer: Option<&'a dyn OperationParametersTransformer>,
    store: &'a Arc<ExecutionStateStore>,
    pointcut: &'a PointcutParameters,
}

impl OperationContext<'_> {
    async fn execute_operation(&self, call: OperationCall) -> Result<Event> {
        let OperationCall {
            mut event,
            mut parameters,
            flow_message,
        } = call;

        if let Some(t) = self.transformer {
            parameters.extend(t.parameters_from_message(&event.message));
        }
        if let Some(message) = flow_message {
            event.message = message;
        }
        self.operation.execute(parameters, event).await
    }
}

/// The rest of an operation chain, as seen from one link.
pub struct OperationNext<'a> {
    links: &'a [Arc<dyn Policy>],
    ctx: &'a OperationContext<'a>,
}

impl<'a> OperationNext<'a> {
    pub fn pointcut(&self) -> &PointcutParameters {
        self.ctx.pointcut
    }

    pub fn remaining(&self) -> usize {
        self.links.len()
    }

    /// Run the next link, or the operation if none is left.
    pub fn run(self, call: OperationCall) -> BoxFuture<'a, Result<Event>> {
        match self.links.split_first() {
            Some((policy, rest)) => {
                tracing::trace!(policy = policy.id(), execution = %call.execution_id(), "entering operation policy");
                let scope = self.ctx.store.scope(call.execution_id().clone());
                let state = PolicyState::new(scope, policy.id());
                let next = OperationNext {
                    links: rest,
                    ctx: self.ctx,
                };
                policy.on_operation(call, next, state)
            }
            None => Box::pin(self.ctx.execute_operation(call)),
        }
    }
}
