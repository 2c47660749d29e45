//! Component identity: which listener or operation an invocation belongs to.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{PolicyError, Result};

/// `namespace:name` identity of a component type (e.g. `http:listener`).
///
/// Identity is what transformer lookups and pointcut factories key on; two
/// components of the same type at different locations share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    namespace: Arc<str>,
    name: Arc<str>,
}

impl ComponentId {
    pub fn new(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for ComponentId {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        // format: "namespace:name"
        let (ns, name) = s.split_once(':').ok_or_else(|| {
            PolicyError::BadRequest(format!("invalid component id: {s} (expected namespace:name)"))
        })?;
        if ns.is_empty() || name.is_empty() {
            return Err(PolicyError::BadRequest(format!(
                "invalid component id: {s} (empty namespace or name)"
            )));
        }
        Ok(Self::new(ns, name))
    }
}

/// A concrete component instance: its identity plus where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    identifier: ComponentId,
    location: Arc<str>,
}

impl Component {
    pub fn new(identifier: ComponentId, location: impl Into<Arc<str>>) -> Self {
        Self {
            identifier,
            location: location.into(),
        }
    }

    pub fn identifier(&self) -> &ComponentId {
        &self.identifier
    }

    /// Flow-relative location, e.g. `orders/source` or `orders/processors/2`.
    pub fn location(&self) -> &str {
        &self.location
    }
}
