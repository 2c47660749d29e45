//! Policy manager: the facade transports and operation callers talk to.
//!
//! Per invocation it resolves pointcut parameters, selects policies, looks up the
//! component's transformer (cached), and hands back a ready-to-run executable.

use std::sync::Arc;

use policyweave_core::{
    Component, Event, ExecutionId, Params, PointcutParameters, Result, SourceOutcome,
};

use crate::chain::{OperationChain, PolicyChainBuilder, SourceChain};
use crate::execution::{FlowExecution, OperationExecution, ResponseParametersProcessor};
use crate::pointcut::{OperationPointcutFactory, PointcutResolver, SourcePointcutFactory};
use crate::policy::{NullPolicyProvider, PolicyProvider, PolicySelector};
use crate::state::{ExecutionStateStore, StateGuard};
use crate::transform::{
    OperationParametersTransformer, SourceParametersTransformer, TransformerRegistry,
};

pub struct PolicyManager {
    selector: PolicySelector,
    pointcuts: PointcutResolver,
    source_transformers: TransformerRegistry<dyn SourceParametersTransformer>,
    operation_transformers: TransformerRegistry<dyn OperationParametersTransformer>,
    chains: PolicyChainBuilder,
    state: Arc<ExecutionStateStore>,
}

impl PolicyManager {
    pub fn builder() -> PolicyManagerBuilder {
        PolicyManagerBuilder::default()
    }

    pub fn create_source_pointcut_parameters(
        &self,
        source: &Component,
        attributes: &Params,
    ) -> PointcutParameters {
        self.pointcuts.source_parameters(source, attributes)
    }

    /// Executable for an inbound invocation at `source`.
    ///
    /// Reuses the event's source pointcut parameters when they were already resolved.
    pub fn create_inbound_executable(
        &self,
        source: &Component,
        event: &Event,
        response: Arc<dyn ResponseParametersProcessor>,
    ) -> InboundExecutable {
        if !self.selector.policies_available() {
            return InboundExecutable {
                chain: SourceChain::Passthrough,
                response,
                pointcut: event.source_pointcut().cloned(),
            };
        }

        let pointcut = match event.source_pointcut() {
            Some(p) => Arc::clone(p),
            None => Arc::new(
                self.pointcuts
                    .source_parameters(source, &event.message.attributes),
            ),
        };

        let policies = self.selector.select_for_source(&pointcut);
        let chain = if policies.is_empty() {
            SourceChain::Passthrough
        } else {
            let transformer = self.source_transformers.lookup(source.identifier());
            self.chains
                .source_chain(policies, transformer, Arc::clone(&pointcut))
        };

        InboundExecutable {
            chain,
            response,
            pointcut: Some(pointcut),
        }
    }

    /// Executable for an outbound call to `operation` made while handling `event`.
    pub fn create_outbound_executable(
        &self,
        operation: &Component,
        event: &Event,
        parameters: Params,
    ) -> OutboundExecutable {
        if !self.selector.policies_available() {
            return OutboundExecutable {
                chain: OperationChain::Passthrough,
                parameters,
            };
        }

        let pointcut = self
            .pointcuts
            .operation_parameters(operation, event, &parameters);
        let policies = self.selector.select_for_operation(&pointcut);
        let chain = if policies.is_empty() {
            OperationChain::Passthrough
        } else {
            let transformer = self.operation_transformers.lookup(operation.identifier());
            self.chains
                .operation_chain(policies, transformer, Arc::new(pointcut))
        };

        OutboundExecutable { chain, parameters }
    }

    /// Destroy the policy state of an invocation. Safe to call repeatedly.
    pub fn dispose_state(&self, execution_id: &ExecutionId) {
        self.state.dispose(execution_id);
    }

    /// Guard that disposes the invocation's state when dropped.
    pub fn state_guard(&self, execution_id: ExecutionId) -> StateGuard {
        StateGuard::new(Arc::clone(&self.state), execution_id)
    }

    pub fn state_store(&self) -> &Arc<ExecutionStateStore> {
        &self.state
    }
}

/// Collaborators are passed in explicitly; anything left out falls back to an empty default.
#[derive(Default)]
pub struct PolicyManagerBuilder {
    provider: Option<Arc<dyn PolicyProvider>>,
    source_transformers: Vec<Arc<dyn SourceParametersTransformer>>,
    operation_transformers: Vec<Arc<dyn OperationParametersTransformer>>,
    source_factories: Vec<Arc<dyn SourcePointcutFactory>>,
    operation_factories: Vec<Arc<dyn OperationPointcutFactory>>,
    state: Option<Arc<ExecutionStateStore>>,
}

impl PolicyManagerBuilder {
    pub fn provider(mut self, provider: Arc<dyn PolicyProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Registration order is lookup order: the first supporting transformer wins.
    pub fn source_transformer(mut self, t: Arc<dyn SourceParametersTransformer>) -> Self {
        self.source_transformers.push(t);
        self
    }

    pub fn operation_transformer(mut self, t: Arc<dyn OperationParametersTransformer>) -> Self {
        self.operation_transformers.push(t);
        self
    }

    pub fn source_pointcut_factory(mut self, f: Arc<dyn SourcePointcutFactory>) -> Self {
        self.source_factories.push(f);
        self
    }

    pub fn operation_pointcut_factory(mut self, f: Arc<dyn OperationPointcutFactory>) -> Self {
        self.operation_factories.push(f);
        self
    }

    /// Share a state store between managers (defaults to a fresh one).
    pub fn state_store(mut self, store: Arc<ExecutionStateStore>) -> Self {
        self.state = Some(store);
        self
    }

    pub fn build(self) -> PolicyManager {
        let provider = self.provider.unwrap_or_else(|| {
            tracing::debug!("no policy provider configured; using null provider");
            Arc::new(NullPolicyProvider)
        });
        let state = self.state.unwrap_or_default();

        PolicyManager {
            selector: PolicySelector::new(provider),
            pointcuts: PointcutResolver::new(self.source_factories, self.operation_factories),
            source_transformers: TransformerRegistry::new(self.source_transformers),
            operation_transformers: TransformerRegistry::new(self.operation_transformers),
            chains: PolicyChainBuilder::new(Arc::clone(&state)),
            state,
        }
    }
}

/// Ready-to-run inbound invocation.
#[derive(Clone)]
pub struct InboundExecutable {
    chain: SourceChain,
    response: Arc<dyn ResponseParametersProcessor>,
    pointcut: Option<Arc<PointcutParameters>>,
}

impl InboundExecutable {
    pub fn chain(&self) -> &SourceChain {
        &self.chain
    }

    pub fn pointcut(&self) -> Option<&Arc<PointcutParameters>> {
        self.pointcut.as_ref()
    }

    /// Run the chain around `flow`.
    ///
    /// The event carries the resolved source pointcut parameters from here on, so
    /// outbound calls made by the flow can be matched against them.
    pub async fn process(&self, mut event: Event, flow: &dyn FlowExecution) -> Result<SourceOutcome> {
        if let Some(p) = &self.pointcut {
            event.set_source_pointcut(Arc::clone(p));
        }
        self.chain.process(event, flow, &self.response).await
    }
}

/// Ready-to-run outbound call.
#[derive(Clone)]
pub struct OutboundExecutable {
    chain: OperationChain,
    parameters: Params,
}

impl OutboundExecutable {
    pub fn chain(&self) -> &OperationChain {
        &self.chain
    }

    pub fn parameters(&self) -> &Params {
        &self.parameters
    }

    pub async fn execute(&self, event: Event, operation: &dyn OperationExecution) -> Result<Event> {
        self.chain
            .execute(event, self.parameters.clone(), operation)
            .await
    }
}
