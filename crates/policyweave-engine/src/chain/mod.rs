//! Policy chain building.
//!
//! Policies `[P1, .., Pn]` around a terminal execution `E` run as
//! `P1(P2(..Pn(E)..))`: P1 is entered first and sees the final result last.
//!
//! A chain with no policies is a passthrough that touches neither transformers nor
//! the state store. Built chains hold no per-invocation data and can serve any
//! number of concurrent invocations.

pub mod operation;
pub mod source;

use std::sync::Arc;

use policyweave_core::{Event, Params, PointcutParameters, Result, SourceOutcome};

use crate::execution::{FlowExecution, OperationExecution, ResponseParametersProcessor};
use crate::policy::Policy;
use crate::state::ExecutionStateStore;
use crate::transform::{OperationParametersTransformer, SourceParametersTransformer};

pub use operation::{CompositeOperationChain, OperationCall, OperationNext};
pub use source::{CompositeSourceChain, SourceNext};

/// Executable for inbound invocations.
#[derive(Clone)]
pub enum SourceChain {
    /// No policy applies: run the flow and wrap its result.
    Passthrough,
    Composite(Arc<CompositeSourceChain>),
}

impl SourceChain {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, SourceChain::Passthrough)
    }

    /// Policy ids, outermost first.
    pub fn policy_ids(&self) -> Vec<&str> {
        match self {
            SourceChain::Passthrough => Vec::new(),
            SourceChain::Composite(c) => c.policy_ids(),
        }
    }

    pub async fn process(
        &self,
        event: Event,
        flow: &dyn FlowExecution,
        response: &Arc<dyn ResponseParametersProcessor>,
    ) -> Result<SourceOutcome> {
        match self {
            SourceChain::Passthrough => source::passthrough(event, flow, response).await,
            SourceChain::Composite(c) => c.process(event, flow, response).await,
        }
    }
}

/// Executable for outbound invocations.
#[derive(Clone)]
pub enum OperationChain {
    /// No policy applies: call the operation with the original parameters.
    Passthrough,
    Composite(Arc<CompositeOperationChain>),
}

impl OperationChain {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, OperationChain::Passthrough)
    }

    pub fn policy_ids(&self) -> Vec<&str> {
        match self {
            OperationChain::Passthrough => Vec::new(),
            OperationChain::Composite(c) => c.policy_ids(),
        }
    }

    pub async fn execute(
        &self,
        event: Event,
        parameters: Params,
        operation: &dyn OperationExecution,
    ) -> Result<Event> {
        match self {
            OperationChain::Passthrough => operation.execute(parameters, event).await,
            OperationChain::Composite(c) => c.execute(event, parameters, operation).await,
        }
    }
}

/// Builds source and operation chains over a shared state store.
#[derive(Clone)]
pub struct PolicyChainBuilder {
    store: Arc<ExecutionStateStore>,
}

impl PolicyChainBuilder {
    pub fn new(store: Arc<ExecutionStateStore>) -> Self {
        Self { store }
    }

    pub fn source_chain(
        &self,
        policies: Vec<Arc<dyn Policy>>,
        transformer: Option<Arc<dyn SourceParametersTransformer>>,
        pointcut: Arc<PointcutParameters>,
    ) -> SourceChain {
        if policies.is_empty() {
            return SourceChain::Passthrough;
        }
        SourceChain::Composite(Arc::new(CompositeSourceChain::new(
            policies,
            transformer,
            Arc::clone(&self.store),
            pointcut,
        )))
    }

    pub fn operation_chain(
        &self,
        policies: Vec<Arc<dyn Policy>>,
        transformer: Option<Arc<dyn OperationParametersTransformer>>,
        pointcut: Arc<PointcutParameters>,
    ) -> OperationChain {
        if policies.is_empty() {
            return OperationChain::Passthrough;
        }
        OperationChain::Composite(Arc::new(CompositeOperationChain::new(
            policies,
            transformer,
            Arc::clone(&self.store),
            pointcut,
        )))
    }
}
