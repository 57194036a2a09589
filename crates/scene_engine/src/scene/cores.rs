//! Shared state cores
//!
//! A core is a render-state object that several nodes may reference. Nodes
//! created with the same `core_id` share one core; anonymous nodes get a
//! private core. Each core counts its users and is dropped with the last one.

use std::collections::HashMap;

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a core stored in a [`CoreRegistry`]
    pub struct CoreKey;
}

#[derive(Debug)]
struct CoreEntry<T> {
    core: T,
    use_count: usize,
    core_id: Option<String>,
}

/// Reference-counted storage for shared cores of one type
#[derive(Debug)]
pub struct CoreRegistry<T> {
    cores: SlotMap<CoreKey, CoreEntry<T>>,
    by_id: HashMap<String, CoreKey>,
}

impl<T> CoreRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            cores: SlotMap::with_key(),
            by_id: HashMap::new(),
        }
    }

    /// Acquire a core for a new node
    ///
    /// With a `core_id` that is already registered, the existing core is
    /// shared and its use count incremented. Otherwise `make` builds a new
    /// core. Returns the key and whether the core was created by this call.
    pub fn acquire(&mut self, core_id: Option<&str>, make: impl FnOnce() -> T) -> (CoreKey, bool) {
        if let Some(key) = core_id.and_then(|id| self.by_id.get(id).copied()) {
            if let Some(entry) = self.cores.get_mut(key) {
                entry.use_count += 1;
                return (key, false);
            }
        }

        let key = self.cores.insert(CoreEntry {
            core: make(),
            use_count: 1,
            core_id: core_id.map(str::to_owned),
        });
        if let Some(id) = core_id {
            self.by_id.insert(id.to_owned(), key);
        }
        (key, true)
    }

    /// Release one use of a core, dropping it when unused
    ///
    /// Returns the core if this was the last use.
    pub fn release(&mut self, key: CoreKey) -> Option<T> {
        let entry = self.cores.get_mut(key)?;
        entry.use_count = entry.use_count.saturating_sub(1);
        if entry.use_count > 0 {
            return None;
        }

        let entry = self.cores.remove(key)?;
        if let Some(id) = &entry.core_id {
            self.by_id.remove(id);
        }
        Some(entry.core)
    }

    /// Borrow a core
    pub fn get(&self, key: CoreKey) -> Option<&T> {
        self.cores.get(key).map(|entry| &entry.core)
    }

    /// Mutably borrow a core
    pub fn get_mut(&mut self, key: CoreKey) -> Option<&mut T> {
        self.cores.get_mut(key).map(|entry| &mut entry.core)
    }

    /// Number of nodes using a core, 0 if it is not registered
    pub fn use_count(&self, key: CoreKey) -> usize {
        self.cores.get(key).map_or(0, |entry| entry.use_count)
    }

    /// Number of registered cores
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether no cores are registered
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Iterate mutably over all cores
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.cores.values_mut().map(|entry| &mut entry.core)
    }
}

impl<T> Default for CoreRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_core_use_count() {
        let mut registry = CoreRegistry::new();
        let (a, created_a) = registry.acquire(Some("mask"), || 1);
        let (b, created_b) = registry.acquire(Some("mask"), || 2);

        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(registry.use_count(a), 2);
        assert_eq!(registry.get(a), Some(&1));

        assert_eq!(registry.release(a), None);
        assert_eq!(registry.release(a), Some(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_anonymous_cores_are_private() {
        let mut registry = CoreRegistry::new();
        let (a, _) = registry.acquire(None, || "a");
        let (b, _) = registry.acquire(None, || "b");
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_id_reusable_after_release() {
        let mut registry = CoreRegistry::new();
        let (a, _) = registry.acquire(Some("x"), || 1);
        registry.release(a);
        let (_, created) = registry.acquire(Some("x"), || 2);
        assert!(created);
    }
}
