//! Registrations and the factories behind them
//!
//! A [`Registration`] is the compiled, immutable form of a builder: an id, a
//! lookup key, a [`Lifetime`] and a type-erased factory. Components are kept
//! erased as `Arc<dyn Any + Send + Sync>` wrapping an `Arc<T>`, which lets
//! trait objects be registered and resolved like any other type.
//!
//! [`Component`] is how a type declares its constructor: an ordered tuple of
//! dependencies ([`Deps`]) and a `construct` function. [`ClassFactory`] resolves
//! those dependencies positionally from a list of keys and calls it.

use crate::key::{Key, RegisterKey, next_registration_id};
use crate::{Container, DiError, Injectable, Lifetime, Result};
use std::any::Any;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased component as stored in caches
pub(crate) type AnyComponent = Arc<dyn Any + Send + Sync>;

/// Type-erased factory function
///
/// `Ok(None)` means the factory produced nothing, which the container
/// reports as [`DiError::InvalidComponent`].
pub(crate) type ErasedFactory =
    Arc<dyn Fn(&Container) -> Result<Option<AnyComponent>> + Send + Sync>;

#[inline]
pub(crate) fn erase<T: ?Sized + Injectable>(component: Arc<T>) -> AnyComponent {
    Arc::new(component)
}

#[inline]
pub(crate) fn downcast<T: ?Sized + Injectable>(
    component: &AnyComponent,
    key: &Key<T>,
) -> Result<Arc<T>> {
    component
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| DiError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

// =============================================================================
// Registration
// =============================================================================

/// Compiled registration record. Immutable once built.
#[derive(Clone)]
pub struct Registration {
    id: u64,
    key: RegisterKey,
    name: Arc<str>,
    lifetime: Lifetime,
    factory: ErasedFactory,
}

impl Registration {
    /// Build a registration for `key` with a freshly allocated id.
    pub fn new<T, F>(key: &Key<T>, lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Injectable,
        F: Fn(&Container) -> Result<Option<Arc<T>>> + Send + Sync + 'static,
    {
        Self {
            id: next_registration_id(),
            key: key.register_key(),
            name: Arc::from(key.name()),
            lifetime,
            factory: Arc::new(move |ctx: &Container| -> Result<Option<AnyComponent>> {
                Ok(factory(ctx)?.map(erase))
            }),
        }
    }

    /// Unique id, also the cache slot for singleton and scoped lifetimes.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Lookup key this registration answers to.
    #[inline]
    pub fn key(&self) -> RegisterKey {
        self.key
    }

    /// Display name of the key.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Run the factory with `ctx` as resolution context.
    #[inline]
    pub(crate) fn create(&self, ctx: &Container) -> Result<Option<AnyComponent>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "tiny_ioc",
            key = %self.name,
            registration_id = self.id,
            lifetime = self.lifetime.as_str(),
            "Invoking factory"
        );

        (self.factory)(ctx)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("key", &self.name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

// =============================================================================
// Component - constructor declaration
// =============================================================================

/// A type the container can construct.
///
/// `Deps` lists the constructor parameters in order. A component whose `Deps`
/// is `()` is built without any key list; any other component needs one,
/// supplied through [`ClassBuilder::args`](crate::ClassBuilder::args).
///
/// # Example
///
/// ```rust
/// use tiny_ioc::{Component, Result};
/// use std::sync::Arc;
///
/// struct Repo;
///
/// impl Component for Repo {
///     type Deps = ();
///     fn construct(_: ()) -> Result<Self> {
///         Ok(Repo)
///     }
/// }
///
/// struct Service {
///     repo: Arc<Repo>,
/// }
///
/// impl Component for Service {
///     type Deps = (Arc<Repo>,);
///     fn construct((repo,): Self::Deps) -> Result<Self> {
///         Ok(Service { repo })
///     }
/// }
/// ```
pub trait Component: Injectable + Sized {
    /// Constructor parameters: `()` or a tuple of `Arc<_>`.
    type Deps: Deps;

    /// Build the component from its resolved dependencies.
    ///
    /// Runs while the resolving container is on the ambient stack, so
    /// [`inject`](crate::inject) may be used here.
    fn construct(deps: Self::Deps) -> Result<Self>;
}

/// Ordered constructor parameters of a [`Component`].
pub trait Deps: Sized + 'static {
    /// Matching tuple of keys, resolved position by position.
    type Keys: Clone + Send + Sync + 'static;

    /// Number of constructor parameters.
    const ARITY: usize;

    /// Keys usable when none were supplied; only parameterless constructors have them.
    fn implicit_keys() -> Option<Self::Keys> {
        None
    }

    /// Resolve every key against `ctx`, in order.
    fn resolve(keys: &Self::Keys, ctx: &Container) -> Result<Self>;
}

impl Deps for () {
    type Keys = ();

    const ARITY: usize = 0;

    #[inline]
    fn implicit_keys() -> Option<Self::Keys> {
        Some(())
    }

    #[inline]
    fn resolve(_keys: &Self::Keys, _ctx: &Container) -> Result<Self> {
        Ok(())
    }
}

// Tuple implementations (1-8 elements)
macro_rules! impl_deps_tuple {
    ($($T:ident $k:ident),+) => {
        impl<$($T: ?Sized + Injectable),+> Deps for ($(Arc<$T>,)+) {
            type Keys = ($(Key<$T>,)+);

            const ARITY: usize = [$(stringify!($T)),+].len();

            #[inline]
            fn resolve(keys: &Self::Keys, ctx: &Container) -> Result<Self> {
                let ($($k,)+) = keys;
                Ok(($(ctx.get($k)?,)+))
            }
        }
    };
}

impl_deps_tuple!(A a);
impl_deps_tuple!(A a, B b);
impl_deps_tuple!(A a, B b, C c);
impl_deps_tuple!(A a, B b, C c, D d);
impl_deps_tuple!(A a, B b, C c, D d, E e);
impl_deps_tuple!(A a, B b, C c, D d, E e, F f);
impl_deps_tuple!(A a, B b, C c, D d, E e, F f, G g);
impl_deps_tuple!(A a, B b, C c, D d, E e, F f, G g, H h);

// =============================================================================
// Class Factory
// =============================================================================

/// Builds a [`Component`] from an optional explicit key list.
pub struct ClassFactory<T: Component> {
    keys: Option<<T::Deps as Deps>::Keys>,
}

impl<T: Component> ClassFactory<T> {
    #[inline]
    pub fn new(keys: Option<<T::Deps as Deps>::Keys>) -> Self {
        Self { keys }
    }

    /// Construct `T`, resolving its dependencies against `ctx`.
    ///
    /// Fails with [`DiError::ClassArgsNotFound`] before resolving anything when
    /// `T` has constructor parameters and no key list was supplied.
    pub fn get(&self, ctx: &Container, key: &str) -> Result<T> {
        let implicit;
        let keys = match &self.keys {
            Some(keys) => keys,
            None => {
                implicit = T::Deps::implicit_keys().ok_or_else(|| DiError::ClassArgsNotFound {
                    key: key.to_string(),
                    class: T::type_name_of(),
                })?;
                &implicit
            }
        };

        let deps = T::Deps::resolve(keys, ctx)?;
        T::construct(deps)
    }

    /// Number of constructor parameters `T` declares.
    #[inline]
    pub fn arity(&self) -> usize {
        T::Deps::ARITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Repo;

    impl Component for Repo {
        type Deps = ();
        fn construct(_: ()) -> Result<Self> {
            Ok(Repo)
        }
    }

    struct Logger {
        prefix: &'static str,
    }

    struct Service {
        repo: Arc<Repo>,
        logger: Arc<Logger>,
    }

    impl Component for Service {
        type Deps = (Arc<Repo>, Arc<Logger>);
        fn construct((repo, logger): Self::Deps) -> Result<Self> {
            Ok(Service { repo, logger })
        }
    }

    #[test]
    fn test_arity() {
        assert_eq!(<() as Deps>::ARITY, 0);
        assert_eq!(<(Arc<Repo>,) as Deps>::ARITY, 1);
        assert_eq!(<(Arc<Repo>, Arc<Logger>) as Deps>::ARITY, 2);
        assert_eq!(ClassFactory::<Service>::new(None).arity(), 2);
    }

    #[test]
    fn test_class_factory_without_params() {
        let container = Container::new();
        let factory = ClassFactory::<Repo>::new(None);

        assert!(factory.get(&container, "Repo").is_ok());
    }

    #[test]
    fn test_class_factory_resolves_keys_in_order() {
        let container = Container::new();
        container.add_class::<Repo>();
        container.add_instance(&Key::<Logger>::of(), Logger { prefix: "LOG" });

        let factory = ClassFactory::<Service>::new(Some((Key::of(), Key::of())));
        let service = factory.get(&container, "Service").unwrap();

        assert_eq!(service.logger.prefix, "LOG");
        let _: &Repo = &service.repo;
    }

    #[test]
    fn test_class_factory_missing_args() {
        let container = Container::new();
        let factory = ClassFactory::<Service>::new(None);

        let err = factory.get(&container, "Service").err().unwrap();
        match err {
            DiError::ClassArgsNotFound { key, class } => {
                assert_eq!(key, "Service");
                assert!(class.ends_with("Service"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_registration_erases_and_downcasts() {
        let key = Key::<Logger>::of();
        let logger = Arc::new(Logger { prefix: "x" });
        let shared = Arc::clone(&logger);
        let registration = Registration::new(&key, Lifetime::Singleton, move |_| {
            Ok(Some(Arc::clone(&shared)))
        });

        let container = Container::new();
        let erased = registration.create(&container).unwrap().unwrap();
        let back = downcast(&erased, &key).unwrap();

        assert!(Arc::ptr_eq(&logger, &back));
        assert_eq!(registration.key(), key.register_key());
        assert_eq!(registration.lifetime(), Lifetime::Singleton);
    }

    #[test]
    fn test_downcast_type_mismatch() {
        let erased = erase(Arc::new(Repo));
        let err = downcast(&erased, &Key::<Logger>::of()).err().unwrap();

        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }
}
