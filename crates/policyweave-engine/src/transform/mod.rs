//! Parameter transformers.
//!
//! A transformer converts between a component's own parameter shape and a
//! [`Message`] policies can read and modify without knowing the component.

pub mod registry;

use policyweave_core::{ComponentId, Message, Params};

pub use registry::TransformerRegistry;

/// Anything registered per component identity (transformers, pointcut factories).
pub trait SupportsComponent: Send + Sync {
    fn supports(&self, component: &ComponentId) -> bool;
}

/// Transformer for inbound (source) response parameters.
pub trait SourceParametersTransformer: SupportsComponent {
    /// Flow success parameters rendered as a message for policies.
    fn message_from_success_parameters(&self, parameters: &Params) -> Message;
    /// Flow failure parameters rendered as a message for policies.
    fn message_from_failure_parameters(&self, parameters: &Params) -> Message;
    /// Success response parameters read back from the (possibly modified) message.
    fn success_parameters_from_message(&self, message: &Message) -> Params;
    /// Error response parameters read back from the (possibly modified) message.
    fn failure_parameters_from_message(&self, message: &Message) -> Params;
}

/// Transformer for outbound (operation) call parameters.
pub trait OperationParametersTransformer: SupportsComponent {
    fn message_from_parameters(&self, parameters: &Params) -> Message;
    fn parameters_from_message(&self, message: &Message) -> Params;
}
