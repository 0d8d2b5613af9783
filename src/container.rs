//! The resolution engine
//!
//! A [`Container`] holds pending builders, a lazily compiled [`Registry`] and
//! an instance cache. Containers form a tree: [`Container::create_scope`]
//! makes a child that falls back to its parent for any key it does not
//! register itself, keeps its own `scoped` instances, and shares the root's
//! `singleton` instances.

use crate::builder::{
    Binding, BuilderSink, ClassBuilder, FactoryBuilder, InstanceBuilder, RegistrationBuilder,
};
use crate::factory::{AnyComponent, Component, Deps, Registration, downcast};
use crate::inject::{ResolvingGuard, StackGuard};
use crate::key::RegisterKey;
use crate::registry::Registry;
use crate::{DiError, Injectable, Key, Lifetime, Module, Result, Scope};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// One cache slot per registration id; initialised at most once.
type CacheSlot = Arc<OnceCell<AnyComponent>>;

struct Inner {
    /// Parent container, `None` for the root
    parent: Option<Container>,
    /// Parentless ancestor, `None` when this is the root
    root: Option<Container>,
    /// Builders registered but not compiled yet
    pending: Mutex<Vec<Arc<dyn RegistrationBuilder>>>,
    /// Fast check for `pending` being non-empty
    has_pending: AtomicBool,
    /// Created on first compilation
    registry: OnceCell<Registry>,
    capacity: usize,
    /// Scoped instances of this container; singletons too when this is the root
    cache: DashMap<u64, CacheSlot, RandomState>,
    depth: u32,
    scope: Scope,
}

/// Inversion-of-control container.
///
/// Cheap to clone: clones are handles to the same container.
///
/// # Examples
///
/// ```rust
/// use tiny_ioc::{Container, create_key};
///
/// let name = create_key::<String>("name");
///
/// let container = Container::new();
/// container.add_instance(&name, "foobar".to_string());
///
/// assert_eq!(*container.get(&name).unwrap(), "foobar");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create a new root container.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a root container whose registry is pre-sized for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        let scope = Scope::new();

        #[cfg(feature = "logging")]
        debug!(
            target: "tiny_ioc",
            scope = %scope,
            depth = 0,
            "Creating new root container"
        );

        Self::from_parts(None, None, capacity, 0, scope)
    }

    fn from_parts(
        parent: Option<Container>,
        root: Option<Container>,
        capacity: usize,
        depth: u32,
        scope: Scope,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent,
                root,
                pending: Mutex::new(Vec::new()),
                has_pending: AtomicBool::new(false),
                registry: OnceCell::new(),
                capacity,
                cache: DashMap::with_capacity_and_hasher_and_shard_amount(
                    0,
                    RandomState::new(),
                    8,
                ),
                depth,
                scope,
            }),
        }
    }

    /// Create a child scope of this container.
    ///
    /// The scope:
    /// - resolves every key registered on its ancestors
    /// - shadows ancestor registrations with its own
    /// - keeps its own `scoped` instances and shares the root's singletons
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tiny_ioc::{Container, create_key};
    ///
    /// let config = create_key::<String>("config");
    /// let request = create_key::<u64>("request");
    ///
    /// let root = Container::new();
    /// root.add_instance(&config, "prod".to_string());
    ///
    /// let scope = root.create_scope();
    /// scope.add_instance(&request, 7u64);
    ///
    /// assert!(scope.has(&config));
    /// assert!(!root.has(&request));
    /// ```
    pub fn create_scope(&self) -> Self {
        let scope = Scope::new();
        let child_depth = self.inner.depth + 1;

        #[cfg(feature = "logging")]
        debug!(
            target: "tiny_ioc",
            scope = %scope,
            parent_scope = %self.inner.scope,
            child_depth = child_depth,
            "Creating child scope"
        );

        Self::from_parts(
            Some(self.clone()),
            Some(self.root().clone()),
            0,
            child_depth,
            scope,
        )
    }

    /// Alias for `create_scope()`.
    #[inline]
    pub fn scope(&self) -> Self {
        self.create_scope()
    }

    /// The parentless ancestor of this container (itself for a root).
    #[inline]
    pub fn root(&self) -> &Container {
        self.inner.root.as_ref().unwrap_or(self)
    }

    #[inline]
    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Get the scope depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    /// Identifier of this container, for diagnostics.
    #[inline]
    pub fn scope_id(&self) -> Scope {
        self.inner.scope
    }

    /// True if both handles point at the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a pre-built instance under `key` (always singleton).
    ///
    /// `instance` may be the value itself or an existing `Arc`, which is how
    /// trait objects are registered.
    #[inline]
    pub fn add_instance<T: ?Sized + Injectable>(
        &self,
        key: &Key<T>,
        instance: impl Into<Arc<T>>,
    ) -> Binding<'_, InstanceBuilder<T>> {
        Binding::new(self, InstanceBuilder::new(key, instance))
    }

    /// Register a [`Component`] under its type key.
    ///
    /// Components with constructor dependencies also need `.args(..)`.
    #[inline]
    pub fn add_class<T: Component>(&self) -> Binding<'_, ClassBuilder<T>> {
        Binding::new(self, ClassBuilder::new())
    }

    /// Register a [`Component`] with its dependency keys, in constructor order.
    #[inline]
    pub fn add_class_with_args<T: Component>(
        &self,
        args: <T::Deps as Deps>::Keys,
    ) -> Binding<'_, ClassBuilder<T>> {
        Binding::new(self, ClassBuilder::with_args(args))
    }

    /// Register a factory function under `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tiny_ioc::{Container, create_key};
    ///
    /// let greeting = create_key::<String>("greeting");
    /// let name = create_key::<String>("name");
    ///
    /// let container = Container::new();
    /// container.add_instance(&name, "world".to_string());
    /// container
    ///     .add_factory(&greeting, {
    ///         let name = name.clone();
    ///         move |ctx| Ok(format!("hello {}", ctx.get(&name)?))
    ///     })
    ///     .singleton();
    ///
    /// assert_eq!(*container.get(&greeting).unwrap(), "hello world");
    /// ```
    #[inline]
    pub fn add_factory<T, F, R>(&self, key: &Key<T>, factory: F) -> Binding<'_, FactoryBuilder<T>>
    where
        T: ?Sized + Injectable,
        F: Fn(&Container) -> Result<R> + Send + Sync + 'static,
        R: Into<Arc<T>>,
    {
        Binding::new(self, FactoryBuilder::new(factory).as_key(key))
    }

    /// Register a factory that may produce nothing; see [`FactoryBuilder::optional`].
    #[inline]
    pub fn add_optional_factory<T, F, R>(
        &self,
        key: &Key<T>,
        factory: F,
    ) -> Binding<'_, FactoryBuilder<T>>
    where
        T: ?Sized + Injectable,
        F: Fn(&Container) -> Result<Option<R>> + Send + Sync + 'static,
        R: Into<Arc<T>>,
    {
        Binding::new(self, FactoryBuilder::optional(factory).as_key(key))
    }

    /// Register a free-standing builder.
    #[inline]
    pub fn add_builder(&self, builder: impl RegistrationBuilder) {
        self.push_builder(Arc::new(builder));
    }

    /// Register every builder collected by `module`.
    pub fn add_module(&self, module: &Module) {
        let builders = module.builders();

        #[cfg(feature = "logging")]
        debug!(
            target: "tiny_ioc",
            scope = %self.inner.scope,
            builders = builders.len(),
            "Adding module"
        );

        let mut pending = self.pending();
        pending.extend(builders);
        self.inner
            .has_pending
            .store(!pending.is_empty(), Ordering::Release);
    }

    #[inline]
    fn pending(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn RegistrationBuilder>>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Compile pending builders into the registry.
    ///
    /// Runs on every lookup; builders added after an earlier compilation are
    /// picked up by the next one. `build` runs under the `pending` lock.
    fn compile(&self) {
        if !self.inner.has_pending.load(Ordering::Acquire) {
            return;
        }

        let mut pending = self.pending();
        if pending.is_empty() {
            return;
        }

        let registry = self
            .inner
            .registry
            .get_or_init(|| Registry::with_capacity(self.inner.capacity));

        #[cfg(feature = "logging")]
        let builders = pending.len();
        #[cfg(feature = "logging")]
        let mut registrations = 0usize;

        for builder in pending.drain(..) {
            for registration in builder.build() {
                #[cfg(feature = "logging")]
                {
                    registrations += 1;
                }
                registry.add(registration);
            }
        }
        self.inner.has_pending.store(false, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "tiny_ioc",
            scope = %self.inner.scope,
            builders = builders,
            registrations = registrations,
            "Compiled pending builders"
        );
    }

    // =========================================================================
    // Lookup Methods
    // =========================================================================

    /// Nearest registration for `key`, walking from this container to the root.
    #[inline]
    pub fn find_registration<T: ?Sized>(&self, key: &Key<T>) -> Option<Registration> {
        self.find_by_key(&key.register_key())
    }

    fn find_by_key(&self, key: &RegisterKey) -> Option<Registration> {
        let mut current = Some(self);
        while let Some(container) = current {
            container.compile();
            if let Some(registration) = container.local_registry().and_then(|r| r.find(key)) {
                return Some(registration);
            }
            current = container.parent();
        }
        None
    }

    /// Every registration for `key` in the nearest container that has any.
    pub fn find_all_registrations<T: ?Sized>(&self, key: &Key<T>) -> Option<Vec<Registration>> {
        let key = key.register_key();
        let mut current = Some(self);
        while let Some(container) = current {
            container.compile();
            if let Some(all) = container.local_registry().and_then(|r| r.get_all(&key)) {
                return Some(all);
            }
            current = container.parent();
        }
        None
    }

    #[inline]
    fn local_registry(&self) -> Option<&Registry> {
        self.inner.registry.get()
    }

    /// Check if `key` resolves here or in any ancestor.
    #[inline]
    pub fn has<T: ?Sized>(&self, key: &Key<T>) -> bool {
        self.find_registration(key).is_some()
    }

    /// Number of keys registered on this container (not including parents).
    pub fn len(&self) -> usize {
        self.compile();
        self.local_registry().map_or(0, Registry::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve `key`, returning `Ok(None)` if nothing is registered for it.
    ///
    /// Every other failure is returned as [`DiError::ResolveFailed`] wrapping
    /// its cause.
    pub fn safe_get<T: ?Sized + Injectable>(&self, key: &Key<T>) -> Result<Option<Arc<T>>> {
        let Some(registration) = self.find_registration(key) else {
            #[cfg(feature = "logging")]
            trace!(
                target: "tiny_ioc",
                key = %key,
                scope = %self.inner.scope,
                "No registration in container or parent chain"
            );
            return Ok(None);
        };

        let component = self
            .resolve_registration(&registration)
            .map_err(|cause| DiError::resolve_failed(key, cause))?;

        downcast(&component, key).map(Some)
    }

    /// Resolve `key`, treating a missing registration as an error.
    pub fn get<T: ?Sized + Injectable>(&self, key: &Key<T>) -> Result<Arc<T>> {
        match self.safe_get(key)? {
            Some(component) => Ok(component),
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "tiny_ioc",
                    key = %key,
                    scope = %self.inner.scope,
                    depth = self.inner.depth,
                    "Component not found"
                );
                Err(DiError::not_found(key))
            }
        }
    }

    /// Alias for `get`.
    #[inline]
    pub fn resolve<T: ?Sized + Injectable>(&self, key: &Key<T>) -> Result<Arc<T>> {
        self.get(key)
    }

    /// Alias for `safe_get`.
    #[inline]
    pub fn try_get<T: ?Sized + Injectable>(&self, key: &Key<T>) -> Result<Option<Arc<T>>> {
        self.safe_get(key)
    }

    /// Resolve every registration for `key`, oldest first.
    ///
    /// Uses the nearest container that registers `key` at all; returns an
    /// empty list if none does.
    pub fn get_all<T: ?Sized + Injectable>(&self, key: &Key<T>) -> Result<Vec<Arc<T>>> {
        let Some(registrations) = self.find_all_registrations(key) else {
            return Ok(Vec::new());
        };

        registrations
            .iter()
            .map(|registration| {
                let component = self
                    .resolve_registration(registration)
                    .map_err(|cause| DiError::resolve_failed(key, cause))?;
                downcast(&component, key)
            })
            .collect()
    }

    /// Produce the component for `registration` on behalf of this container.
    fn resolve_registration(&self, registration: &Registration) -> Result<AnyComponent> {
        let _stack = StackGuard::enter(self);

        match registration.lifetime() {
            Lifetime::Singleton => self.root().cached(registration, self),
            Lifetime::Scoped => self.cached(registration, self),
            Lifetime::Transient => {
                let _resolving =
                    ResolvingGuard::enter((self.addr(), registration.id()), registration.name())?;
                self.create(registration)
            }
        }
    }

    /// Look up `registration` in this container's cache, creating it with
    /// `ctx` as context on a miss.
    fn cached(&self, registration: &Registration, ctx: &Container) -> Result<AnyComponent> {
        let id = registration.id();
        let slot = Arc::clone(self.inner.cache.entry(id).or_default().value());

        if let Some(component) = slot.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "tiny_ioc",
                key = registration.name(),
                registration_id = id,
                scope = %self.inner.scope,
                "Cache hit"
            );
            return Ok(Arc::clone(component));
        }

        let _resolving = ResolvingGuard::enter((self.addr(), id), registration.name())?;
        slot.get_or_try_init(|| {
            #[cfg(feature = "logging")]
            trace!(
                target: "tiny_ioc",
                key = registration.name(),
                registration_id = id,
                lifetime = registration.lifetime().as_str(),
                scope = %self.inner.scope,
                "Cache miss, creating component"
            );
            ctx.create(registration)
        })
        .cloned()
    }

    fn create(&self, registration: &Registration) -> Result<AnyComponent> {
        registration
            .create(self)?
            .ok_or_else(|| DiError::InvalidComponent {
                key: registration.name().to_string(),
                registration_id: registration.id(),
            })
    }
}

impl BuilderSink for Container {
    fn push_builder(&self, builder: Arc<dyn RegistrationBuilder>) {
        let mut pending = self.pending();
        pending.push(builder);
        self.inner.has_pending.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "tiny_ioc",
            scope = %self.inner.scope,
            pending = pending.len(),
            "Registered builder"
        );
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.inner.scope)
            .field("depth", &self.inner.depth)
            .field(
                "registered_keys",
                &self.local_registry().map_or(0, Registry::len),
            )
            .field("pending_builders", &self.pending().len())
            .field("cached_instances", &self.inner.cache.len())
            .finish()
    }
}
