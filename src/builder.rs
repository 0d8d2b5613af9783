//! Registration builders
//!
//! Builders are the deferred, configurable form of a registration. A
//! container keeps them pending and compiles them into [`Registration`]
//! records on its first lookup, one record per alias key.
//!
//! The `add_*` methods of [`Container`](crate::Container) and
//! [`Module`](crate::Module) return a [`Binding`]: a fluent handle that hands
//! its builder over when dropped. Once handed over the builder can no longer
//! be reconfigured.
//!
//! ```rust
//! use tiny_ioc::{Component, Container, Key, Result, create_key};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! impl Component for FixedClock {
//!     type Deps = ();
//!     fn construct(_: ()) -> Result<Self> { Ok(FixedClock) }
//! }
//!
//! let clock = create_key::<dyn Clock>("Clock");
//!
//! let container = Container::new();
//! container
//!     .add_class::<FixedClock>()
//!     .singleton()
//!     .alias(&clock, |c| c as Arc<dyn Clock>);
//!
//! assert_eq!(container.get(&clock).unwrap().now(), 42);
//! assert!(container.has(&Key::<FixedClock>::of()));
//! ```

use crate::factory::{ClassFactory, Component, Deps, Registration};
use crate::{Container, Injectable, Key, Lifetime, Result};
use std::sync::Arc;

/// Anything that compiles into registrations.
///
/// `build` may run more than once (a [`Module`](crate::Module) shared by
/// several containers); every run allocates fresh registration ids.
pub trait RegistrationBuilder: Send + Sync + 'static {
    /// Emit one registration per alias key.
    ///
    /// Runs while the owning container holds its pending-builder lock, so it
    /// must not call into any container (`has`, `get`, `add_*`, ...);
    /// doing so deadlocks. Container access belongs in the factories the
    /// registrations wrap.
    fn build(&self) -> Vec<Registration>;
}

/// Receiver of committed builders.
pub(crate) trait BuilderSink {
    fn push_builder(&self, builder: Arc<dyn RegistrationBuilder>);
}

// =============================================================================
// Instance Builder
// =============================================================================

/// Registers a pre-built value. Always singleton, always exactly one key.
pub struct InstanceBuilder<T: ?Sized> {
    key: Key<T>,
    instance: Arc<T>,
}

impl<T: ?Sized + Injectable> InstanceBuilder<T> {
    #[inline]
    pub fn new(key: &Key<T>, instance: impl Into<Arc<T>>) -> Self {
        Self {
            key: key.clone(),
            instance: instance.into(),
        }
    }
}

impl<T: ?Sized + Injectable> RegistrationBuilder for InstanceBuilder<T> {
    fn build(&self) -> Vec<Registration> {
        let instance = Arc::clone(&self.instance);
        vec![Registration::new(&self.key, Lifetime::Singleton, move |_| {
            Ok(Some(Arc::clone(&instance)))
        })]
    }
}

// =============================================================================
// Class Builder
// =============================================================================

/// Emits the registration for one alias key, given the shared factory.
type AliasFn<T> = Box<dyn Fn(&Arc<ClassFactory<T>>, Lifetime) -> Registration + Send + Sync>;

/// Registers a [`Component`] built by the container.
///
/// Defaults to `transient`, keyed by `Key::<T>::of()`. Every alias gets its
/// own registration id, so aliases never share a cached instance.
pub struct ClassBuilder<T: Component> {
    aliases: Vec<AliasFn<T>>,
    lifetime: Lifetime,
    args: Option<<T::Deps as Deps>::Keys>,
}

impl<T: Component> ClassBuilder<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            aliases: Vec::new(),
            lifetime: Lifetime::Transient,
            args: None,
        }
        .as_key(&Key::of())
    }

    /// Start with an explicit dependency key list.
    #[inline]
    pub fn with_args(args: <T::Deps as Deps>::Keys) -> Self {
        Self::new().args(args)
    }

    /// Set (or replace) the constructor dependency keys.
    #[inline]
    pub fn args(mut self, args: <T::Deps as Deps>::Keys) -> Self {
        self.args = Some(args);
        self
    }

    #[inline]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[inline]
    pub fn singleton(self) -> Self {
        self.lifetime(Lifetime::Singleton)
    }

    #[inline]
    pub fn scoped(self) -> Self {
        self.lifetime(Lifetime::Scoped)
    }

    #[inline]
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// Also register under `key`.
    pub fn as_key(mut self, key: &Key<T>) -> Self {
        let key = key.clone();
        self.aliases.push(Box::new(move |factory: &Arc<ClassFactory<T>>, lifetime: Lifetime| {
            let factory = Arc::clone(factory);
            let name = key.name().to_string();
            Registration::new(&key, lifetime, move |ctx| {
                Ok(Some(Arc::new(factory.get(ctx, &name)?)))
            })
        }));
        self
    }

    /// Also register under a key of another type, converting with `cast`.
    ///
    /// Mostly used to expose a component as a trait object:
    /// `.alias(&logger_key, |c| c as Arc<dyn Logger>)`.
    pub fn alias<U, F>(mut self, key: &Key<U>, cast: F) -> Self
    where
        U: ?Sized + Injectable,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        let key = key.clone();
        let cast = Arc::new(cast);
        self.aliases.push(Box::new(move |factory: &Arc<ClassFactory<T>>, lifetime: Lifetime| {
            let factory = Arc::clone(factory);
            let cast = Arc::clone(&cast);
            let name = key.name().to_string();
            Registration::new(&key, lifetime, move |ctx| {
                let component = Arc::new(factory.get(ctx, &name)?);
                Ok(Some((*cast)(component)))
            })
        }));
        self
    }

    /// Number of keys this builder registers under.
    #[inline]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

impl<T: Component> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> RegistrationBuilder for ClassBuilder<T> {
    fn build(&self) -> Vec<Registration> {
        let factory = Arc::new(ClassFactory::<T>::new(self.args.clone()));
        self.aliases
            .iter()
            .map(|alias| alias(&factory, self.lifetime))
            .collect()
    }
}

// =============================================================================
// Factory Builder
// =============================================================================

type FactoryFn<T> = Arc<dyn Fn(&Container) -> Result<Option<Arc<T>>> + Send + Sync>;

/// Registers a caller-supplied construction function.
///
/// Defaults to `transient`. Has no implicit key: a factory builder with no
/// key added registers nothing.
pub struct FactoryBuilder<T: ?Sized> {
    factory: FactoryFn<T>,
    keys: Vec<Key<T>>,
    lifetime: Lifetime,
}

impl<T: ?Sized + Injectable> FactoryBuilder<T> {
    /// Wrap a factory. `R` is `T` itself or anything convertible into `Arc<T>`.
    pub fn new<F, R>(factory: F) -> Self
    where
        F: Fn(&Container) -> Result<R> + Send + Sync + 'static,
        R: Into<Arc<T>>,
    {
        Self::from_fn(Arc::new(move |ctx: &Container| -> Result<Option<Arc<T>>> {
            Ok(Some(factory(ctx)?.into()))
        }))
    }

    /// Wrap a factory that may produce nothing.
    ///
    /// Resolving a registration whose factory returned `None` fails with
    /// [`DiError::InvalidComponent`](crate::DiError::InvalidComponent).
    pub fn optional<F, R>(factory: F) -> Self
    where
        F: Fn(&Container) -> Result<Option<R>> + Send + Sync + 'static,
        R: Into<Arc<T>>,
    {
        Self::from_fn(Arc::new(move |ctx: &Container| -> Result<Option<Arc<T>>> {
            Ok(factory(ctx)?.map(Into::into))
        }))
    }

    fn from_fn(factory: FactoryFn<T>) -> Self {
        Self {
            factory,
            keys: Vec::new(),
            lifetime: Lifetime::Transient,
        }
    }

    #[inline]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[inline]
    pub fn singleton(self) -> Self {
        self.lifetime(Lifetime::Singleton)
    }

    #[inline]
    pub fn scoped(self) -> Self {
        self.lifetime(Lifetime::Scoped)
    }

    #[inline]
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// Register under `key`.
    #[inline]
    pub fn as_key(mut self, key: &Key<T>) -> Self {
        self.keys.push(key.clone());
        self
    }

    #[inline]
    pub fn alias_count(&self) -> usize {
        self.keys.len()
    }
}

impl<T: ?Sized + Injectable> RegistrationBuilder for FactoryBuilder<T> {
    fn build(&self) -> Vec<Registration> {
        self.keys
            .iter()
            .map(|key| {
                let factory = Arc::clone(&self.factory);
                Registration::new(key, self.lifetime, move |ctx| factory(ctx))
            })
            .collect()
    }
}

// =============================================================================
// Binding - fluent handle
// =============================================================================

/// Fluent handle returned by the `add_*` methods.
///
/// The builder is committed to its container or module when the handle is
/// dropped, normally at the end of the registering statement.
pub struct Binding<'a, B: RegistrationBuilder> {
    sink: &'a dyn BuilderSink,
    builder: Option<B>,
}

impl<'a, B: RegistrationBuilder> Binding<'a, B> {
    #[inline]
    pub(crate) fn new(sink: &'a dyn BuilderSink, builder: B) -> Self {
        Self {
            sink,
            builder: Some(builder),
        }
    }

    #[inline]
    fn map(mut self, f: impl FnOnce(B) -> B) -> Self {
        self.builder = self.builder.take().map(f);
        self
    }
}

impl<B: RegistrationBuilder> Drop for Binding<'_, B> {
    fn drop(&mut self) {
        if let Some(builder) = self.builder.take() {
            self.sink.push_builder(Arc::new(builder));
        }
    }
}

impl<T: Component> Binding<'_, ClassBuilder<T>> {
    /// See [`ClassBuilder::args`].
    #[inline]
    pub fn args(self, args: <T::Deps as Deps>::Keys) -> Self {
        self.map(|b| b.args(args))
    }

    #[inline]
    pub fn lifetime(self, lifetime: Lifetime) -> Self {
        self.map(|b| b.lifetime(lifetime))
    }

    #[inline]
    pub fn singleton(self) -> Self {
        self.map(ClassBuilder::singleton)
    }

    #[inline]
    pub fn scoped(self) -> Self {
        self.map(ClassBuilder::scoped)
    }

    #[inline]
    pub fn transient(self) -> Self {
        self.map(ClassBuilder::transient)
    }

    /// See [`ClassBuilder::as_key`].
    #[inline]
    pub fn as_key(self, key: &Key<T>) -> Self {
        self.map(|b| b.as_key(key))
    }

    /// See [`ClassBuilder::alias`].
    #[inline]
    pub fn alias<U, F>(self, key: &Key<U>, cast: F) -> Self
    where
        U: ?Sized + Injectable,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        self.map(|b| b.alias(key, cast))
    }
}

impl<T: ?Sized + Injectable> Binding<'_, FactoryBuilder<T>> {
    #[inline]
    pub fn lifetime(self, lifetime: Lifetime) -> Self {
        self.map(|b| b.lifetime(lifetime))
    }

    #[inline]
    pub fn singleton(self) -> Self {
        self.map(FactoryBuilder::singleton)
    }

    #[inline]
    pub fn scoped(self) -> Self {
        self.map(FactoryBuilder::scoped)
    }

    #[inline]
    pub fn transient(self) -> Self {
        self.map(FactoryBuilder::transient)
    }

    /// See [`FactoryBuilder::as_key`].
    #[inline]
    pub fn as_key(self, key: &Key<T>) -> Self {
        self.map(|b| b.as_key(key))
    }
}
