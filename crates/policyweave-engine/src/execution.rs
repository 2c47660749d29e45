//! Terminal executions and the response-parameter processor.
//!
//! These are the seams to the code the engine wraps: the flow behind a listener,
//! the operation behind an outbound call, and the transport's way of turning a
//! finished event into response parameters.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use policyweave_core::{Event, Params, Result};

/// The real inbound flow logic at the end of a source chain.
///
/// A domain failure must be reported as [`PolicyError::Execution`] so the chain
/// can turn it into a failure outcome. Any other error propagates unconverted.
///
/// [`PolicyError::Execution`]: policyweave_core::PolicyError::Execution
#[async_trait]
pub trait FlowExecution: Send + Sync {
    async fn execute(&self, event: Event) -> Result<Event>;
}

#[async_trait]
impl<F, Fut> FlowExecution for F
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Event>> + Send,
{
    async fn execute(&self, event: Event) -> Result<Event> {
        (self)(event).await
    }
}

/// The real outbound call at the end of an operation chain.
#[async_trait]
pub trait OperationExecution: Send + Sync {
    async fn execute(&self, parameters: Params, event: Event) -> Result<Event>;
}

#[async_trait]
impl<F, Fut> OperationExecution for F
where
    F: Fn(Params, Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Event>> + Send,
{
    async fn execute(&self, parameters: Params, event: Event) -> Result<Event> {
        (self)(parameters, event).await
    }
}

/// Supplies response parameters for a finished inbound invocation.
pub trait ResponseParametersProcessor: Send + Sync {
    /// Parameters for a successful response built from the result event.
    fn success_parameters(&self, result: &Event) -> Params;
    /// Parameters for an error response built from the failed event.
    fn failure_parameters(&self, failed: &Event) -> Params;
}

type ParamsFn = Arc<dyn Fn(&Event) -> Params + Send + Sync>;

/// Closure-backed [`ResponseParametersProcessor`].
#[derive(Clone)]
pub struct ResponseParametersFn {
    success: ParamsFn,
    failure: ParamsFn,
}

impl ResponseParametersFn {
    pub fn new(
        success: impl Fn(&Event) -> Params + Send + Sync + 'static,
        failure: impl Fn(&Event) -> Params + Send + Sync + 'static,
    ) -> Self {
        Self {
            success: Arc::new(success),
            failure: Arc::new(failure),
        }
    }
}

impl ResponseParametersProcessor for ResponseParametersFn {
    fn success_parameters(&self, result: &Event) -> Params {
        (self.success)(result)
    }

    fn failure_parameters(&self, failed: &Event) -> Params {
        (self.failure)(failed)
    }
}
