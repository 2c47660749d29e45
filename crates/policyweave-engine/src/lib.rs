//! policyweave engine library entry.
//!
//! This crate wires pointcut resolution, policy selection, transformer lookup,
//! per-invocation state, and chain composition behind the [`PolicyManager`]
//! facade. It is consumed by the demo binary (`main.rs`), by transports, and by
//! integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod chain;
pub mod config;
pub mod execution;
pub mod manager;
pub mod pointcut;
pub mod policy;
pub mod state;
pub mod transform;

pub use chain::{OperationCall, OperationChain, OperationNext, PolicyChainBuilder, SourceChain, SourceNext};
pub use execution::{FlowExecution, OperationExecution, ResponseParametersFn, ResponseParametersProcessor};
pub use manager::{InboundExecutable, OutboundExecutable, PolicyManager, PolicyManagerBuilder};
pub use policy::{NullPolicyProvider, Policy, PolicyProvider};
pub use state::{ExecutionStateStore, PolicyState, StateGuard};
