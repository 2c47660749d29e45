use std::sync::Arc;

use dashmap::DashMap;

use policyweave_core::ComponentId;

use super::SupportsComponent;

/// Caches, per component identity, which registered transformer supports it.
///
/// The first lookup of an identity scans the candidates in registration order and
/// keeps the first match, or the absence of one. Candidate order is therefore the
/// tie-break when several transformers claim the same identity. Component topology
/// is static after startup, so entries are never invalidated.
pub struct TransformerRegistry<T: ?Sized> {
    candidates: Vec<Arc<T>>,
    cache: DashMap<ComponentId, Option<Arc<T>>>,
}

impl<T: ?Sized + SupportsComponent> TransformerRegistry<T> {
    pub fn new(candidates: Vec<Arc<T>>) -> Self {
        Self {
            candidates,
            cache: DashMap::new(),
        }
    }

    pub fn lookup(&self, component: &ComponentId) -> Option<Arc<T>> {
        if let Some(cached) = self.cache.get(component) {
            return cached.value().clone();
        }

        // entry() holds the shard lock while scanning: concurrent first lookups of
        // the same identity scan once and store once. `supports` must not call back
        // into this registry.
        self.cache
            .entry(component.clone())
            .or_insert_with(|| self.scan(component))
            .value()
            .clone()
    }

    /// Number of identities resolved so far (hits and misses).
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn scan(&self, component: &ComponentId) -> Option<Arc<T>> {
        let mut claimants = self.candidates.iter().filter(|t| t.supports(component));
        let found = claimants.next().cloned();
        if found.is_some() {
            let others = claimants.count();
            if others > 0 {
                tracing::debug!(%component, others, "several transformers claim component; first registered wins");
            }
        }
        tracing::debug!(%component, found = found.is_some(), "transformer lookup cached");
        found
    }
}

impl<T: ?Sized> Default for TransformerRegistry<T> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            cache: DashMap::new(),
        }
    }
}
