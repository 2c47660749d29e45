//! Shared error type across policyweave crates.

use std::fmt;

use thiserror::Error;

use crate::event::Event;

/// Stable error codes (safe to surface to callers and logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The terminal execution failed.
    ExecutionFailed,
    /// A policy link itself failed.
    PolicyFailed,
    /// A policy refused the invocation.
    Rejected,
    /// Invalid input / malformed configuration.
    BadRequest,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Internal engine error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and response parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ExecutionFailed => "EXECUTION_FAILED",
            ErrorCode::PolicyFailed => "POLICY_FAILED",
            ErrorCode::Rejected => "REJECTED",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Unified error type used by core and engine.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The terminal execution failed. Source chains turn this into a failure outcome.
    #[error("execution failed: {0}")]
    Execution(Box<ExecutionFailure>),
    /// A policy link failed. Never converted into a failure outcome.
    #[error("policy `{policy}` failed: {reason}")]
    Policy { policy: String, reason: String },
    /// A policy refused to let an operation proceed.
    #[error("rejected by policy `{policy}`: {reason}")]
    Rejected { policy: String, reason: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl PolicyError {
    /// Wrap a failed terminal execution together with the event it failed on.
    pub fn execution(event: Event, cause: impl Into<String>) -> Self {
        PolicyError::Execution(Box::new(ExecutionFailure {
            event,
            cause: cause.into(),
        }))
    }

    pub fn policy(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        PolicyError::Policy {
            policy: policy.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        PolicyError::Rejected {
            policy: policy.into(),
            reason: reason.into(),
        }
    }

    /// Map the error to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PolicyError::Execution(_) => ErrorCode::ExecutionFailed,
            PolicyError::Policy { .. } => ErrorCode::PolicyFailed,
            PolicyError::Rejected { .. } => ErrorCode::Rejected,
            PolicyError::BadRequest(_) => ErrorCode::BadRequest,
            PolicyError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            PolicyError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// A failed terminal execution: the cause plus the event as it stood when it failed.
#[derive(Debug, Clone)]
pub struct ExecutionFailure {
    event: Event,
    cause: String,
}

impl ExecutionFailure {
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn into_event(self) -> Event {
        self.event
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (execution={})", self.cause, self.event.execution_id())
    }
}
