//! Source (inbound) chains.
//!
//! Only a [`PolicyError::Execution`] reaching the top of the chain becomes a
//! failure outcome. Errors raised by policies themselves propagate as errors.

use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;

use policyweave_core::outcome::ErrorParamsFn;
use policyweave_core::{
    Event, ExecutionFailure, LazyParams, Params, PointcutParameters, PolicyError, Result,
    SourceFailure, SourceOutcome, SourceSuccess,
};

use crate::execution::{FlowExecution, ResponseParametersProcessor};
use crate::policy::Policy;
use crate::state::{ExecutionStateStore, PolicyState};
use crate::transform::SourceParametersTransformer;

/// Response parameters the flow produced, kept for the outcome.
enum FlowParameters {
    Success(Params),
    Failure(Params),
}

/// Policies wrapped around an inbound flow.
pub struct CompositeSourceChain {
    policies: Vec<Arc<dyn Policy>>,
    transformer: Option<Arc<dyn SourceParametersTransformer>>,
    store: Arc<ExecutionStateStore>,
    pointcut: Arc<PointcutParameters>,
}

impl CompositeSourceChain {
    pub fn new(
        policies: Vec<Arc<dyn Policy>>,
        transformer: Option<Arc<dyn SourceParametersTransformer>>,
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

    pub async fn process(
        &self,
        event: Event,
        flow: &dyn FlowExecution,
        response: &Arc<dyn ResponseParametersProcessor>,
    ) -> Result<SourceOutcome> {
        let ctx = SourceContext {
            flow,
            response: response.as_ref(),
            transformer: self.transformer.as_deref(),
            store: &self.store,
            pointcut: &self.pointcut,
            flow_parameters: Mutex::new(None),
        };
        let next = SourceNext {
            links: &self.policies,
            ctx: &ctx,
        };
        let result = next.run(event).await;
        let flow_parameters = ctx.take_flow_parameters();

        match result {
            Ok(result) => Ok(SourceOutcome::Success(success_outcome(
                result,
                flow_parameters,
                response,
                self.transformer.clone(),
            ))),
            Err(PolicyError::Execution(failure)) => Ok(SourceOutcome::Failure(failure_outcome(
                *failure,
                flow_parameters,
                response,
                self.transformer.clone(),
            ))),
            Err(other) => Err(other),
        }
    }
}

/// Everything the links of one inbound invocation share.
struct SourceContext<'a> {
    flow: &'a dyn FlowExecution,
    response: &'a dyn ResponseParametersProcessor,
    transformer: Option<&'a dyn SourceParametersTransformer>,
    store: &'a Arc<ExecutionStateStore>,
    pointcut: &'a PointcutParameters,
    flow_parameters: Mutex<Option<FlowParameters>>,
}

impl SourceContext<'_> {
    async fn execute_flow(&self, event: Event) -> Result<Event> {
        let Some(transformer) = self.transformer else {
            return self.flow.execute(event).await;
        };

        // Policies see the flow's response parameters, rendered as a message.
        match self.flow.execute(event).await {
            Ok(mut result) => {
                let params = self.response.success_parameters(&result);
                result.message = transformer.message_from_success_parameters(&params);
                self.keep_flow_parameters(FlowParameters::Success(params));
                Ok(result)
            }
            Err(PolicyError::Execution(failure)) => {
                let params = self.response.failure_parameters(failure.event());
                let message = transformer.message_from_failure_parameters(&params);
                self.keep_flow_parameters(FlowParameters::Failure(params));
                let cause = failure.cause().to_owned();
                Err(PolicyError::execution(
                    failure.into_event().with_message(message),
                    cause,
                ))
            }
            Err(other) => Err(other),
        }
    }

    fn keep_flow_parameters(&self, params: FlowParameters) {
        if let Ok(mut slot) = self.flow_parameters.lock() {
            *slot = Some(params);
        }
    }

    fn take_flow_parameters(&self) -> Option<FlowParameters> {
        self.flow_parameters.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// The rest of a source chain, as seen from one link.
pub struct SourceNext<'a> {
    links: &'a [Arc<dyn Policy>],
    ctx: &'a SourceContext<'a>,
}

impl<'a> SourceNext<'a> {
    /// Pointcut parameters the chain was selected with.
    pub fn pointcut(&self) -> &PointcutParameters {
        self.ctx.pointcut
    }

    /// Links left before the flow runs.
    pub fn remaining(&self) -> usize {
        self.links.len()
    }

    /// Run the next link, or the flow if none is left.
    pub fn run(self, event: Event) -> BoxFuture<'a, Result<Event>> {
        match self.links.split_first() {
            Some((policy, rest)) => {
                tracing::trace!(policy = policy.id(), execution = %event.execution_id(), "entering source policy");
                let scope = self.ctx.store.scope(event.execution_id().clone());
                let state = PolicyState::new(scope, policy.id());
                let next = SourceNext {
                    links: rest,
                    ctx: self.ctx,
                };
                policy.on_source(event, next, state)
            }
            None => Box::pin(self.ctx.execute_flow(event)),
        }
    }
}

/// No policy applies: the flow's result maps straight onto the outcome.
pub(crate) async fn passthrough(
    event: Event,
    flow: &dyn FlowExecution,
    response: &Arc<dyn ResponseParametersProcessor>,
) -> Result<SourceOutcome> {
    match flow.execute(event).await {
        Ok(result) => Ok(SourceOutcome::Success(success_outcome(result, None, response, None))),
        Err(PolicyError::Execution(failure)) => Ok(SourceOutcome::Failure(failure_outcome(
            *failure, None, response, None,
        ))),
        Err(other) => Err(other),
    }
}

fn success_outcome(
    result: Event,
    flow_parameters: Option<FlowParameters>,
    response: &Arc<dyn ResponseParametersProcessor>,
    transformer: Option<Arc<dyn SourceParametersTransformer>>,
) -> SourceSuccess {
    let error_parameters = error_parameters_fn(response, transformer.clone());
    let response = Arc::clone(response);
    let snapshot = result.clone();
    let parameters = LazyParams::new(move || match transformer {
        Some(t) => {
            let mut params = match flow_parameters {
                Some(FlowParameters::Success(p)) => p,
                _ => response.success_parameters(&snapshot),
            };
            params.extend(t.success_parameters_from_message(&snapshot.message));
            params
        }
        None => response.success_parameters(&snapshot),
    });
    SourceSuccess::new(result, parameters, error_parameters)
}

fn failure_outcome(
    failure: ExecutionFailure,
    flow_parameters: Option<FlowParameters>,
    response: &Arc<dyn ResponseParametersProcessor>,
    transformer: Option<Arc<dyn SourceParametersTransformer>>,
) -> SourceFailure {
    let response = Arc::clone(response);
    let snapshot = failure.event().clone();
    let parameters = LazyParams::new(move || match transformer {
        Some(t) => {
            let mut params = match flow_parameters {
                Some(FlowParameters::Failure(p)) => p,
                _ => response.failure_parameters(&snapshot),
            };
            params.extend(t.failure_parameters_from_message(&snapshot.message));
            params
        }
        None => response.failure_parameters(&snapshot),
    });
    SourceFailure::new(failure, parameters)
}

fn error_parameters_fn(
    response: &Arc<dyn ResponseParametersProcessor>,
    transformer: Option<Arc<dyn SourceParametersTransformer>>,
) -> ErrorParamsFn {
    let response = Arc::clone(response);
    Arc::new(move |event: &Event| {
        let mut params = response.failure_parameters(event);
        if let Some(t) = &transformer {
            params.extend(t.failure_parameters_from_message(&event.message));
        }
        params
    })
}
