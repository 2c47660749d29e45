//! Pointcut parameter resolution.
//!
//! Turns raw invocation context into the [`PointcutParameters`] a provider matches
//! policies against. Resolution is pure: same inputs and factories, same output.

use std::sync::Arc;

use policyweave_core::{Component, ComponentId, Event, Params, PointcutParameters};

use crate::transform::SupportsComponent;

/// Builds source pointcut parameters for the listeners it supports.
pub trait SourcePointcutFactory: SupportsComponent {
    fn create(&self, source: &Component, attributes: &Params) -> PointcutParameters;
}

/// Builds operation pointcut parameters for the operations it supports.
///
/// `source` is the enclosing inbound invocation's parameters, if any; factories
/// should carry it through with [`PointcutParameters::with_source`].
pub trait OperationPointcutFactory: SupportsComponent {
    fn create(
        &self,
        operation: &Component,
        source: Option<Arc<PointcutParameters>>,
        parameters: &Params,
    ) -> PointcutParameters;
}

/// Aggregates the registered factories.
///
/// The first factory (in registration order) supporting the component wins.
/// Without one, the result is the bare component parameters.
#[derive(Default)]
pub struct PointcutResolver {
    source_factories: Vec<Arc<dyn SourcePointcutFactory>>,
    operation_factories: Vec<Arc<dyn OperationPointcutFactory>>,
}

impl PointcutResolver {
    pub fn new(
        source_factories: Vec<Arc<dyn SourcePointcutFactory>>,
        operation_factories: Vec<Arc<dyn OperationPointcutFactory>>,
    ) -> Self {
        Self {
            source_factories,
            operation_factories,
        }
    }

    pub fn source_parameters(&self, source: &Component, attributes: &Params) -> PointcutParameters {
        self.source_factories
            .iter()
            .find(|f| f.supports(source.identifier()))
            .map(|f| f.create(source, attributes))
            .unwrap_or_else(|| PointcutParameters::new(source.clone()))
    }

    pub fn operation_parameters(
        &self,
        operation: &Component,
        event: &Event,
        parameters: &Params,
    ) -> PointcutParameters {
        let source = event.source_pointcut().cloned();
        match self
            .operation_factories
            .iter()
            .find(|f| f.supports(operation.identifier()))
        {
            Some(f) => f.create(operation, source, parameters),
            None => PointcutParameters::new(operation.clone()).with_source(source),
        }
    }
}

/// Source factory that exposes selected request attributes as pointcut attributes.
///
/// Handy for listeners whose selection keys are plain attributes (`method`, `path`).
pub struct AttributeSourcePointcutFactory {
    supports: Box<dyn Fn(&ComponentId) -> bool + Send + Sync>,
    keys: Vec<String>,
}

impl AttributeSourcePointcutFactory {
    pub fn new(
        supports: impl Fn(&ComponentId) -> bool + Send + Sync + 'static,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            supports: Box::new(supports),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl SupportsComponent for AttributeSourcePointcutFactory {
    fn supports(&self, component: &ComponentId) -> bool {
        (self.supports)(component)
    }
}

impl SourcePointcutFactory for AttributeSourcePointcutFactory {
    fn create(&self, source: &Component, attributes: &Params) -> PointcutParameters {
        let selected: Params = self
            .keys
            .iter()
            .filter_map(|k| attributes.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        PointcutParameters::new(source.clone()).with_attributes(selected)
    }
}
