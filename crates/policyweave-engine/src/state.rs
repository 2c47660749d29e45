//! Per-invocation policy state.
//!
//! Entries are keyed by execution id and created on first write. Only the links of
//! that invocation's chain touch an entry; the caller destroys it with
//! [`ExecutionStateStore::dispose`] once the invocation is fully drained.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

use policyweave_core::ExecutionId;

/// Type-erased state value.
pub type StateValue = Arc<dyn Any + Send + Sync>;

/// Slots of one invocation, keyed by `(scope, key)`.
#[derive(Default)]
struct ExecutionState {
    slots: DashMap<(String, String), StateValue>,
}

/// Process-wide store: `execution id -> slots`.
#[derive(Default)]
pub struct ExecutionStateStore {
    executions: DashMap<ExecutionId, Arc<ExecutionState>>,
}

impl ExecutionStateStore {
    pub fn new() -> Self {
        Self {
            executions: DashMap::new(),
        }
    }

    /// Handle onto one invocation's state. Creates nothing until written.
    pub fn scope(self: &Arc<Self>, execution_id: ExecutionId) -> ExecutionScope {
        ExecutionScope {
            store: Arc::clone(self),
            execution_id,
        }
    }

    pub fn contains(&self, execution_id: &ExecutionId) -> bool {
        self.executions.contains_key(execution_id)
    }

    /// Number of live invocation entries.
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Destroy all state of an invocation. Idempotent; returns whether an entry existed.
    pub fn dispose(&self, execution_id: &ExecutionId) -> bool {
        let removed = self.executions.remove(execution_id).is_some();
        tracing::debug!(execution = %execution_id, removed, "policy state disposed");
        removed
    }

    fn existing(&self, execution_id: &ExecutionId) -> Option<Arc<ExecutionState>> {
        self.executions
            .get(execution_id)
            .map(|e| Arc::clone(e.value()))
    }

    fn get_or_create(&self, execution_id: &ExecutionId) -> Arc<ExecutionState> {
        Arc::clone(
            self.executions
                .entry(execution_id.clone())
                .or_default()
                .value(),
        )
    }
}

/// State of one invocation, across all of its policies.
#[derive(Clone)]
pub struct ExecutionScope {
    store: Arc<ExecutionStateStore>,
    execution_id: ExecutionId,
}

impl ExecutionScope {
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    pub fn get<T: Any + Send + Sync>(&self, scope: &str, key: &str) -> Option<Arc<T>> {
        let state = self.store.existing(&self.execution_id)?;
        let value = state
            .slots
            .get(&(scope.to_owned(), key.to_owned()))
            .map(|v| Arc::clone(v.value()))?;
        value.downcast::<T>().ok()
    }

    /// Store a value, replacing any previous one under the same key.
    pub fn put<T: Any + Send + Sync>(&self, scope: &str, key: &str, value: T) {
        let state = self.store.get_or_create(&self.execution_id);
        state
            .slots
            .insert((scope.to_owned(), key.to_owned()), Arc::new(value));
    }

    pub fn remove(&self, scope: &str, key: &str) -> bool {
        let Some(state) = self.store.existing(&self.execution_id) else {
            return false;
        };
        state
            .slots
            .remove(&(scope.to_owned(), key.to_owned()))
            .is_some()
    }
}

/// State handle a policy link receives: the invocation's state, scoped by policy id.
#[derive(Clone)]
pub struct PolicyState {
    scope: ExecutionScope,
    policy_id: Arc<str>,
}

impl PolicyState {
    pub(crate) fn new(scope: ExecutionScope, policy_id: &str) -> Self {
        Self {
            scope,
            policy_id: Arc::from(policy_id),
        }
    }

    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.scope.get(&self.policy_id, key)
    }

    pub fn put<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.scope.put(&self.policy_id, key, value)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.scope.remove(&self.policy_id, key)
    }

    /// Unscoped view, for state shared between the policies of one invocation.
    pub fn execution(&self) -> &ExecutionScope {
        &self.scope
    }
}

/// Disposes an invocation's state when dropped.
///
/// Covers paths where the invocation future is dropped before completion.
pub struct StateGuard {
    store: Arc<ExecutionStateStore>,
    execution_id: ExecutionId,
}

impl StateGuard {
    pub fn new(store: Arc<ExecutionStateStore>, execution_id: ExecutionId) -> Self {
        Self {
            store,
            execution_id,
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        self.store.dispose(&self.execution_id);
    }
}
