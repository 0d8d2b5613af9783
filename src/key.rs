//! Resolve keys and process-wide id generation
//!
//! A [`Key<T>`] names a component that resolves to `Arc<T>`. It comes in two
//! forms:
//!
//! - a **type key** ([`Key::of`]) backed by the `TypeId` of `T`, one per type;
//! - a **wrapped key** ([`create_key`]) backed by a fresh process-unique token,
//!   so a contract (often a trait object) can be registered without any
//!   concrete type, and one type can be bound under several independent names.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Untyped lookup key stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKey {
    /// Token of a wrapped key
    Token(u64),
    /// Identity of a type key
    Type(TypeId),
}

/// Which form a [`Key`] takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Created by [`create_key`]
    Wrapped,
    /// Created by [`Key::of`]
    Type,
}

/// Typed resolve key for a component of type `T`.
///
/// # Examples
///
/// ```rust
/// use tiny_ioc::{Key, create_key};
///
/// trait Logger: Send + Sync {}
///
/// let by_type = Key::<String>::of();
/// let by_name = create_key::<dyn Logger>("Logger");
///
/// assert_eq!(by_name.name(), "Logger");
/// assert_ne!(create_key::<dyn Logger>("Logger"), by_name);
/// assert_eq!(Key::<String>::of(), by_type);
/// ```
pub struct Key<T: ?Sized> {
    register: RegisterKey,
    kind: KeyKind,
    name: Arc<str>,
    _component: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + 'static> Key<T> {
    /// The type key of `T`.
    #[inline]
    pub fn of() -> Self {
        Self {
            register: RegisterKey::Type(TypeId::of::<T>()),
            kind: KeyKind::Type,
            name: Arc::from(std::any::type_name::<T>()),
            _component: PhantomData,
        }
    }
}

impl<T: ?Sized> Key<T> {
    /// Lookup key used by the registry.
    #[inline]
    pub fn register_key(&self) -> RegisterKey {
        self.register
    }

    /// Form of this key.
    #[inline]
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Human-readable name for diagnostics.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this key was made by [`create_key`].
    #[inline]
    pub fn is_wrapped(&self) -> bool {
        self.kind == KeyKind::Wrapped
    }
}

/// Create a fresh wrapped key. Every call returns a distinct key, even for
/// the same name.
pub fn create_key<T: ?Sized>(name: impl Into<String>) -> Key<T> {
    static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

    let name: String = name.into();
    Key {
        register: RegisterKey::Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)),
        kind: KeyKind::Wrapped,
        name: Arc::from(name),
        _component: PhantomData,
    }
}

impl<T: ?Sized> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            register: self.register,
            kind: self.kind,
            name: Arc::clone(&self.name),
            _component: PhantomData,
        }
    }
}

impl<T: ?Sized> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.register == other.register
    }
}

impl<T: ?Sized> Eq for Key<T> {}

impl<T: ?Sized> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.register.hash(state);
    }
}

impl<T: ?Sized> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<T: ?Sized> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("register", &self.register)
            .finish()
    }
}

// =============================================================================
// Registration Ids
// =============================================================================

/// Monotonic id source; ids start at 1.
struct IdCounter(AtomicU64);

impl IdCounter {
    const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

static REGISTRATION_IDS: IdCounter = IdCounter::new();

/// Allocate the next registration id. Ids start at 1 and only grow.
#[inline]
pub fn next_registration_id() -> u64 {
    REGISTRATION_IDS.next()
}

/// Restart registration ids from 1.
///
/// Test utility only: containers that compiled before the reset may reuse
/// cache slots with registrations compiled after it.
#[doc(hidden)]
pub fn reset_registration_ids() {
    REGISTRATION_IDS.reset();
}
