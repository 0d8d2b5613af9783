//! Reusable bundles of registrations
//!
//! A [`Module`] collects builders without belonging to any container.
//! [`Container::add_module`](crate::Container::add_module) copies them into a
//! container's pending list; the same module can be added to any number of
//! containers, each getting its own registrations and instances.

use crate::builder::{
    Binding, BuilderSink, ClassBuilder, FactoryBuilder, InstanceBuilder, RegistrationBuilder,
};
use crate::factory::Component;
use crate::{Container, Injectable, Key, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// Ordered list of builders.
///
/// # Examples
///
/// ```rust
/// use tiny_ioc::{Container, Module, create_key};
///
/// let port = create_key::<u16>("port");
///
/// let module = Module::new();
/// module.add_instance(&port, 8080u16);
///
/// let container = Container::new();
/// container.add_module(&module);
///
/// assert_eq!(*container.get(&port).unwrap(), 8080);
/// ```
#[derive(Default)]
pub struct Module {
    builders: Mutex<Vec<Arc<dyn RegistrationBuilder>>>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_instance<T: ?Sized + Injectable>(
        &self,
        key: &Key<T>,
        instance: impl Into<Arc<T>>,
    ) -> Binding<'_, InstanceBuilder<T>> {
        Binding::new(self, InstanceBuilder::new(key, instance))
    }

    #[inline]
    pub fn add_class<T: Component>(&self) -> Binding<'_, ClassBuilder<T>> {
        Binding::new(self, ClassBuilder::new())
    }

    #[inline]
    pub fn add_factory<T, F, R>(&self, key: &Key<T>, factory: F) -> Binding<'_, FactoryBuilder<T>>
    where
        T: ?Sized + Injectable,
        F: Fn(&Container) -> Result<R> + Send + Sync + 'static,
        R: Into<Arc<T>>,
    {
        Binding::new(self, FactoryBuilder::new(factory).as_key(key))
    }

    #[inline]
    pub fn add_builder(&self, builder: impl RegistrationBuilder) {
        self.push_builder(Arc::new(builder));
    }

    /// Snapshot of the collected builders, in registration order.
    pub fn builders(&self) -> Vec<Arc<dyn RegistrationBuilder>> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn RegistrationBuilder>>> {
        self.builders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BuilderSink for Module {
    fn push_builder(&self, builder: Arc<dyn RegistrationBuilder>) {
        self.lock().push(builder);
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("builders", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_key;

    struct Clock;

    impl Component for Clock {
        type Deps = ();
        fn construct(_: ()) -> Result<Self> {
            Ok(Clock)
        }
    }

    #[test]
    fn test_collects_builders_in_order() {
        let name = create_key::<String>("name");
        let module = Module::new();
        assert!(module.is_empty());

        module.add_instance(&name, "a".to_string());
        module.add_class::<Clock>().singleton();
        module.add_factory(&name, |_| Ok("b".to_string()));

        assert_eq!(module.len(), 3);

        let container = Container::new();
        container.add_module(&module);

        assert_eq!(*container.get(&name).unwrap(), "b");
        assert_eq!(container.get_all(&name).unwrap().len(), 2);
    }

    #[test]
    fn test_container_registrations_after_module_win() {
        let name = create_key::<String>("name");
        let module = Module::new();
        module.add_instance(&name, "module".to_string());

        let container = Container::new();
        container.add_module(&module);
        container.add_instance(&name, "container".to_string());

        assert_eq!(*container.get(&name).unwrap(), "container");
    }

    #[test]
    fn test_module_added_to_scope_shadows_root() {
        let name = create_key::<String>("name");
        let module = Module::new();
        module.add_instance(&name, "scope".to_string());

        let root = Container::new();
        root.add_instance(&name, "root".to_string());
        let scope = root.create_scope();
        scope.add_module(&module);

        assert_eq!(*scope.get(&name).unwrap(), "scope");
        assert_eq!(*root.get(&name).unwrap(), "root");
    }
}
