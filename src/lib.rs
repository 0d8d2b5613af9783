//! # tiny-ioc - a small inversion-of-control container
//!
//! Register components under typed keys, then resolve them. The container
//! builds what it is asked for, its dependencies first, and caches the
//! results according to each registration's [`Lifetime`].
//!
//! ## Features
//!
//! - **Typed keys** - a [`Key<T>`] is either the type itself (`Key::of()`) or
//!   a named key from [`create_key`], and may point at a trait object
//! - **Three registration shapes** - instances, components built by the
//!   container ([`Component`]) and factory functions
//! - **Hierarchical scopes** - children see their ancestors' registrations,
//!   keep their own `scoped` instances and share the root's singletons
//! - **Ambient injection** - [`inject`] resolves from whichever container
//!   is constructing the current component
//! - **Concurrent** - `DashMap` registries, once-only cache initialisation
//! - **Observable** - optional `tracing` events under the `tiny_ioc` target
//!
//! ## Quick Start
//!
//! ```rust
//! use tiny_ioc::{Component, Container, Key, Result, create_key, inject};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("LOG: {message}")
//!     }
//! }
//!
//! struct Repo;
//!
//! impl Component for Repo {
//!     type Deps = ();
//!     fn construct(_: ()) -> Result<Self> { Ok(Repo) }
//! }
//!
//! // Logger comes from the constructor, Repo from the ambient container
//! struct Service {
//!     logger: Arc<dyn Logger>,
//!     repo: Arc<Repo>,
//! }
//!
//! impl Component for Service {
//!     type Deps = (Arc<dyn Logger>,);
//!     fn construct((logger,): Self::Deps) -> Result<Self> {
//!         Ok(Service { logger, repo: inject(&Key::of())? })
//!     }
//! }
//!
//! let logger = create_key::<dyn Logger>("Logger");
//!
//! let container = Container::new();
//! container.add_instance(&logger, Arc::new(ConsoleLogger) as Arc<dyn Logger>);
//! container.add_class::<Repo>().singleton();
//! container.add_class::<Service>().args((logger.clone(),));
//!
//! let service = container.get(&Key::<Service>::of()).unwrap();
//! assert_eq!(service.logger.log("hi"), "LOG: hi");
//! assert!(Arc::ptr_eq(&service.repo, &container.get(&Key::of()).unwrap()));
//! ```
//!
//! ## Lifetimes
//!
//! ```rust
//! use tiny_ioc::{Container, create_key};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static NEXT: AtomicU64 = AtomicU64::new(0);
//!
//! let id = create_key::<u64>("request-id");
//!
//! let root = Container::new();
//! root.add_factory(&id, |_| Ok(NEXT.fetch_add(1, Ordering::SeqCst))).scoped();
//!
//! let a = root.create_scope();
//! let b = root.create_scope();
//!
//! // One instance per scope
//! assert_eq!(a.get(&id).unwrap(), a.get(&id).unwrap());
//! assert_ne!(a.get(&id).unwrap(), b.get(&id).unwrap());
//! ```
//!
//! ## Failure Reporting
//!
//! Lookups of unregistered keys fail with [`DiError::NotFound`] (or `Ok(None)`
//! from [`Container::safe_get`]). Anything that goes wrong after a
//! registration was found comes back as [`DiError::ResolveFailed`] wrapping its
//! cause; [`DiError::root_cause`] digs out the innermost one.

mod builder;
mod container;
mod error;
mod factory;
mod inject;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod module;
mod provider;
mod registry;
mod scope;

pub use builder::{Binding, ClassBuilder, FactoryBuilder, InstanceBuilder, RegistrationBuilder};
pub use container::Container;
pub use error::{DiError, Result};
pub use factory::{ClassFactory, Component, Deps, Registration};
pub use inject::{
    current_container, inject, peek_stack, pop_stack, push_stack, reset_stack, stack_depth,
};
pub use key::{Key, KeyKind, RegisterKey, create_key, next_registration_id, reset_registration_ids};
pub use module::Module;
pub use provider::{Injectable, Lifetime};
pub use registry::Registry;
pub use scope::Scope;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Component, Container, DiError, Injectable, Key, Lifetime, Module, Result, create_key,
        inject,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    struct Database {
        url: String,
    }

    struct UserService {
        db: Arc<Database>,
    }

    impl Component for UserService {
        type Deps = (Arc<Database>,);
        fn construct((db,): Self::Deps) -> Result<Self> {
            Ok(UserService { db })
        }
    }

    #[test]
    fn test_instance_registration() {
        let url = create_key::<String>("url");
        let container = Container::new();
        container.add_instance(&url, "postgres://localhost".to_string());

        assert_eq!(*container.get(&url).unwrap(), "postgres://localhost");
    }

    #[test]
    fn test_type_key_and_named_key_are_distinct() {
        let named = create_key::<Database>("Database");
        let container = Container::new();
        container.add_instance(&Key::<Database>::of(), Database { url: "typed".into() });

        assert!(container.has(&Key::<Database>::of()));
        assert!(!container.has(&named));
    }

    #[test]
    fn test_override_in_scope() {
        let root = Container::new();
        root.add_instance(&Key::<Database>::of(), Database {
            url: "production".into(),
        });
        root.add_class::<UserService>().args((Key::of(),)).scoped();

        let test_scope = root.create_scope();
        test_scope.add_instance(&Key::<Database>::of(), Database { url: "test".into() });

        let root_service = root.get(&Key::<UserService>::of()).unwrap();
        let scoped_service = test_scope.get(&Key::<UserService>::of()).unwrap();

        assert_eq!(root_service.db.url, "production");
        assert_eq!(scoped_service.db.url, "test");
    }

    #[test]
    fn test_not_found_error() {
        let container = Container::new();
        let err = container.get(&Key::<Database>::of()).err().unwrap();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("Database"));
    }

    #[test]
    fn test_lifetime_default_is_transient() {
        assert_eq!(Lifetime::default(), Lifetime::Transient);
    }
}
