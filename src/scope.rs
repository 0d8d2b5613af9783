//! Scope identifiers
//!
//! Every container, root or child, carries a [`Scope`] so log lines and
//! `Debug` output can tell containers apart.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique container identifier, displayed as `scope-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(u64);

impl Scope {
    /// Allocate the next identifier.
    #[inline]
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Container;

    #[test]
    fn test_scope_ids_increase() {
        let first = Scope::new();
        let second = Scope::new();

        assert!(second > first);
        assert_ne!(first, second);
    }

    #[test]
    fn test_scope_display() {
        let scope = Scope::new();
        assert_eq!(scope.to_string(), format!("scope-{}", scope.id()));
    }

    #[test]
    fn test_every_container_has_own_scope() {
        let root = Container::new();
        let a = root.create_scope();
        let b = root.create_scope();

        assert_ne!(a.scope_id(), b.scope_id());
        assert_ne!(root.scope_id(), a.scope_id());
        assert_eq!(a.scope_id(), a.clone().scope_id());
    }
}
