//! Invocation snapshot types that flow through a policy chain.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::pointcut::PointcutParameters;

/// Generic key-value representation policies inspect and modify.
pub type Params = serde_json::Map<String, Value>;

static NEXT_EXECUTION: AtomicU64 = AtomicU64::new(1);

/// Unique key for one logical invocation.
///
/// Scopes per-invocation policy state and its disposal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(Arc<str>);

impl ExecutionId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Process-unique id (`exec-<n>`), for callers without their own correlation id.
    pub fn generate() -> Self {
        let n = NEXT_EXECUTION.fetch_add(1, Ordering::Relaxed);
        Self(Arc::from(format!("exec-{n}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload plus attributes (e.g. request method, response status).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub payload: Value,
    pub attributes: Params,
}

impl Message {
    pub fn new(payload: Value, attributes: Params) -> Self {
        Self { payload, attributes }
    }

    /// Message with attributes only (`payload` is `null`).
    pub fn with_attributes(attributes: Params) -> Self {
        Self {
            payload: Value::Null,
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// One invocation as seen by policy links and the terminal execution.
#[derive(Debug, Clone)]
pub struct Event {
    execution_id: ExecutionId,
    pub message: Message,
    source_pointcut: Option<Arc<PointcutParameters>>,
}

impl Event {
    pub fn new(execution_id: ExecutionId, message: Message) -> Self {
        Self {
            execution_id,
            message,
            source_pointcut: None,
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// Pointcut parameters of the inbound invocation this event belongs to, once resolved.
    pub fn source_pointcut(&self) -> Option<&Arc<PointcutParameters>> {
        self.source_pointcut.as_ref()
    }

    pub fn with_source_pointcut(mut self, params: Arc<PointcutParameters>) -> Self {
        self.source_pointcut = Some(params);
        self
    }

    pub fn set_source_pointcut(&mut self, params: Arc<PointcutParameters>) {
        self.source_pointcut = Some(params);
    }

    /// Same invocation, different message.
    pub fn with_message(mut self, message: Message) -> Self {
        self.message = message;
        self
    }
}
