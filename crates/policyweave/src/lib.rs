//! Top-level facade crate for policyweave.
//!
//! Re-exports the core model and the engine so users can depend on a single crate.

pub mod core {
    pub use policyweave_core::*;
}

pub mod engine {
    pub use policyweave_engine::*;
}
