//! policyweave core: invocation model, outcomes, and the shared error surface.
//!
//! This crate defines the data contracts shared by the engine, policy authors,
//! and the transports that drive invocations. It carries no runtime or async
//! dependencies so policy crates can depend on it alone.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `PolicyError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod component;
pub mod error;
pub mod event;
pub mod outcome;
pub mod pointcut;

/// Shared result type.
pub use error::{Result, PolicyError};

pub use component::{Component, ComponentId};
pub use error::{ErrorCode, ExecutionFailure};
pub use event::{Event, ExecutionId, Message, Params};
pub use outcome::{LazyParams, SourceFailure, SourceOutcome, SourceSuccess};
pub use pointcut::PointcutParameters;
