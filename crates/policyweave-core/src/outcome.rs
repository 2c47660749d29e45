//! Outcome of an inbound (source) invocation.

use std::fmt;
use std::sync::Arc;

use crate::error::ExecutionFailure;
use crate::event::{Event, Params};

/// Response parameters computed on demand.
///
/// The transport may never ask for them (e.g. the client went away), so the
/// conversion runs only when [`LazyParams::resolve`] is called.
pub struct LazyParams(Box<dyn FnOnce() -> Params + Send>);

impl LazyParams {
    pub fn new(f: impl FnOnce() -> Params + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn resolve(self) -> Params {
        (self.0)()
    }
}

impl fmt::Debug for LazyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyParams(..)")
    }
}

/// Builds failure response parameters for an event.
pub type ErrorParamsFn = Arc<dyn Fn(&Event) -> Params + Send + Sync>;

/// Either the invocation produced a result, or the terminal execution failed.
#[derive(Debug)]
pub enum SourceOutcome {
    Success(SourceSuccess),
    Failure(SourceFailure),
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success(_))
    }

    /// Event the outcome was produced from (result or failed event).
    pub fn event(&self) -> &Event {
        match self {
            SourceOutcome::Success(s) => s.result(),
            SourceOutcome::Failure(f) => f.failure().event(),
        }
    }

    pub fn success(self) -> Option<SourceSuccess> {
        match self {
            SourceOutcome::Success(s) => Some(s),
            SourceOutcome::Failure(_) => None,
        }
    }

    pub fn failure(self) -> Option<SourceFailure> {
        match self {
            SourceOutcome::Success(_) => None,
            SourceOutcome::Failure(f) => Some(f),
        }
    }
}

pub struct SourceSuccess {
    result: Event,
    parameters: LazyParams,
    error_parameters: ErrorParamsFn,
}

impl SourceSuccess {
    pub fn new(result: Event, parameters: LazyParams, error_parameters: ErrorParamsFn) -> Self {
        Self {
            result,
            parameters,
            error_parameters,
        }
    }

    pub fn result(&self) -> &Event {
        &self.result
    }

    /// Evaluate the success response parameters.
    pub fn response_parameters(self) -> Params {
        self.parameters.resolve()
    }

    /// Failure parameters for `event`, for when delivering the success response itself fails.
    pub fn error_response_parameters(&self, event: &Event) -> Params {
        (self.error_parameters)(event)
    }

    pub fn into_parts(self) -> (Event, LazyParams) {
        (self.result, self.parameters)
    }
}

impl fmt::Debug for SourceSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSuccess")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct SourceFailure {
    failure: ExecutionFailure,
    parameters: LazyParams,
}

impl SourceFailure {
    pub fn new(failure: ExecutionFailure, parameters: LazyParams) -> Self {
        Self { failure, parameters }
    }

    pub fn failure(&self) -> &ExecutionFailure {
        &self.failure
    }

    /// Evaluate the failure response parameters.
    pub fn response_parameters(self) -> Params {
        self.parameters.resolve()
    }

    pub fn into_parts(self) -> (ExecutionFailure, LazyParams) {
        (self.failure, self.parameters)
    }
}
