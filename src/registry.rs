//! Registration index for a single container
//!
//! Uses DashMap for lock-free concurrent access. Every key maps to the
//! registrations added for it, in insertion order: lookups see the last one,
//! [`Registry::get_all`] sees all of them.

use crate::factory::Registration;
use crate::key::RegisterKey;
use ahash::RandomState;
use dashmap::DashMap;

/// Thread-safe mapping from lookup key to ordered registrations
pub struct Registry {
    items: DashMap<RegisterKey, Vec<Registration>, RandomState>,
}

impl Registry {
    /// Create an empty registry.
    ///
    /// Uses 8 shards: containers rarely hold more than a few dozen keys.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity, scaling shards with it.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            items: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Append a registration to the sequence for its key.
    #[inline]
    pub fn add(&self, registration: Registration) {
        self.items
            .entry(registration.key())
            .or_default()
            .push(registration);
    }

    /// Last registration added for `key`.
    #[inline]
    pub fn find(&self, key: &RegisterKey) -> Option<Registration> {
        self.items.get(key).and_then(|list| list.last().cloned())
    }

    /// Check if `key` has any registration
    #[inline]
    pub fn has(&self, key: &RegisterKey) -> bool {
        self.find(key).is_some()
    }

    /// Every registration for `key`, oldest first.
    #[inline]
    pub fn get_all(&self, key: &RegisterKey) -> Option<Vec<Registration>> {
        self.items.get(key).map(|list| list.clone())
    }

    /// Number of distinct keys
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All keys with at least one registration
    pub fn keys(&self) -> Vec<RegisterKey> {
        self.items.iter().map(|r| *r.key()).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Key, Lifetime, create_key};
    use std::sync::Arc;

    struct Foobar;

    fn registration(key: &Key<str>, value: &'static str) -> Registration {
        Registration::new(key, Lifetime::Transient, move |_| Ok(Some(Arc::from(value))))
    }

    #[test]
    fn test_add_with_wrapped_key() {
        let registry = Registry::new();
        let key = create_key::<str>("testKey");
        let reg = registration(&key, "test");
        let id = reg.id();

        registry.add(reg);
        let actual = registry.find(&key.register_key()).unwrap();

        assert_eq!(actual.id(), id);
    }

    #[test]
    fn test_add_with_type_key() {
        let registry = Registry::new();
        let key = Key::<Foobar>::of();
        let reg = Registration::new(&key, Lifetime::Transient, |_| Ok(Some(Arc::new(Foobar))));
        let id = reg.id();

        registry.add(reg);

        assert_eq!(registry.find(&key.register_key()).unwrap().id(), id);
        assert!(registry.has(&key.register_key()));
    }

    #[test]
    fn test_find_missing() {
        let registry = Registry::new();
        let key = create_key::<str>("nonExistentKey");

        assert!(registry.find(&key.register_key()).is_none());
        assert!(!registry.has(&key.register_key()));
        assert!(registry.get_all(&key.register_key()).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = Registry::new();
        let key = create_key::<str>("duplicateKey");
        let first = registration(&key, "first");
        let second = registration(&key, "second");
        let second_id = second.id();

        registry.add(first);
        registry.add(second);

        assert_eq!(registry.find(&key.register_key()).unwrap().id(), second_id);
    }

    #[test]
    fn test_get_all_in_insertion_order() {
        let registry = Registry::new();
        let key = create_key::<str>("multiKey");
        let first = registration(&key, "first");
        let second = registration(&key, "second");
        let ids = [first.id(), second.id()];

        registry.add(first);
        registry.add(second);

        let all: Vec<u64> = registry
            .get_all(&key.register_key())
            .unwrap()
            .iter()
            .map(Registration::id)
            .collect();

        assert_eq!(all, ids);
        assert_eq!(registry.len(), 1);
    }
}
