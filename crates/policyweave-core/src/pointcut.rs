//! Pointcut parameters: the attribute set policy selection matches against.

use std::sync::Arc;

use serde_json::Value;

use crate::component::{Component, ComponentId};
use crate::event::Params;

/// Flat, comparable attribute set describing one invocation for policy selection.
///
/// Source parameters describe an inbound invocation (listener + request attributes).
/// Operation parameters describe an outbound call and carry the source parameters of
/// the inbound invocation they run inside, so providers can match on both.
#[derive(Debug, Clone, PartialEq)]
pub struct PointcutParameters {
    component: Component,
    attributes: Params,
    source: Option<Arc<PointcutParameters>>,
}

impl PointcutParameters {
    /// Bare parameters: component only, no attributes.
    pub fn new(component: Component) -> Self {
        Self {
            component,
            attributes: Params::new(),
            source: None,
        }
    }

    pub fn with_attributes(mut self, attributes: Params) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: Option<Arc<PointcutParameters>>) -> Self {
        self.source = source;
        self
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn component_id(&self) -> &ComponentId {
        self.component.identifier()
    }

    pub fn attributes(&self) -> &Params {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Enclosing inbound invocation's parameters (operation parameters only).
    pub fn source(&self) -> Option<&PointcutParameters> {
        self.source.as_deref()
    }
}
