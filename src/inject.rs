//! Ambient resolution stack
//!
//! While a container runs a factory it sits on top of a thread-local stack of
//! resolving containers. Code running inside that factory (typically a
//! [`Component::construct`](crate::Component::construct)) can call [`inject`] to
//! pull more dependencies from the same container without being handed it.
//!
//! ```rust
//! use tiny_ioc::{Component, Container, Key, Result, inject};
//! use std::sync::Arc;
//!
//! struct Repo;
//!
//! impl Component for Repo {
//!     type Deps = ();
//!     fn construct(_: ()) -> Result<Self> { Ok(Repo) }
//! }
//!
//! struct Service {
//!     repo: Arc<Repo>,
//! }
//!
//! impl Component for Service {
//!     type Deps = ();
//!     fn construct(_: ()) -> Result<Self> {
//!         Ok(Service { repo: inject(&Key::of())? })
//!     }
//! }
//!
//! let container = Container::new();
//! container.add_class::<Repo>();
//! container.add_class::<Service>();
//!
//! let service = container.get(&Key::<Service>::of()).unwrap();
//! let _: &Repo = &service.repo;
//! ```
//!
//! The stack is per thread: resolutions on different threads never see each
//! other's containers.

use crate::{Container, DiError, Injectable, Key, Result};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

thread_local! {
    /// Containers currently running a factory on this thread, innermost last
    static STACK: RefCell<Vec<Container>> = const { RefCell::new(Vec::new()) };

    /// Cache slots (owner address, registration id) whose factory is running
    static RESOLVING: RefCell<HashSet<(usize, u64)>> = RefCell::new(HashSet::new());
}

/// Push `container` unless it is already on top.
///
/// Returns `true` if the stack grew.
pub fn push_stack(container: &Container) -> bool {
    STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.last().is_some_and(|top| top.ptr_eq(container)) {
            return false;
        }

        stack.push(container.clone());

        #[cfg(feature = "logging")]
        trace!(
            target: "tiny_ioc",
            scope = %container.scope_id(),
            stack_depth = stack.len(),
            "Pushed container onto ambient stack"
        );

        true
    })
}

/// Remove the top of the stack.
pub fn pop_stack() {
    // Dropping the popped handle may run arbitrary Drop code; keep it out of the borrow.
    let popped = STACK.with(|stack| stack.borrow_mut().pop());

    #[cfg(feature = "logging")]
    if let Some(container) = &popped {
        trace!(
            target: "tiny_ioc",
            scope = %container.scope_id(),
            "Popped container from ambient stack"
        );
    }

    drop(popped);
}

/// Container on top of the stack, if any.
pub fn peek_stack() -> Option<Container> {
    STACK.with(|stack| stack.borrow().last().cloned())
}

/// Number of containers on this thread's stack.
pub fn stack_depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

/// Container on top of the stack.
///
/// Fails with [`DiError::CurrentContainerNotFound`] when no container is
/// resolving on this thread.
pub fn current_container() -> Result<Container> {
    peek_stack().ok_or(DiError::CurrentContainerNotFound)
}

/// Clear this thread's stack. Test utility.
pub fn reset_stack() {
    let drained = STACK.with(|stack| std::mem::take(&mut *stack.borrow_mut()));
    drop(drained);
    RESOLVING.with(|resolving| resolving.borrow_mut().clear());
}

/// Resolve `key` from the container currently constructing a component.
pub fn inject<T: ?Sized + Injectable>(key: &Key<T>) -> Result<Arc<T>> {
    current_container()?.get(key)
}

// =============================================================================
// Guards
// =============================================================================

/// Keeps a container on the stack for the duration of one resolution.
///
/// Pops on drop only if it pushed, so nested resolutions on the same
/// container stay balanced on every exit path, unwinding included.
pub(crate) struct StackGuard {
    pushed: bool,
}

impl StackGuard {
    #[inline]
    pub(crate) fn enter(container: &Container) -> Self {
        Self {
            pushed: push_stack(container),
        }
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        if self.pushed {
            pop_stack();
        }
    }
}

/// Marks a cache slot as under construction on this thread.
pub(crate) struct ResolvingGuard {
    slot: (usize, u64),
}

impl ResolvingGuard {
    /// Fails with [`DiError::CircularDependency`] if the slot is already
    /// being constructed further up the call stack.
    pub(crate) fn enter(slot: (usize, u64), key: &str) -> Result<Self> {
        let inserted = RESOLVING.with(|resolving| resolving.borrow_mut().insert(slot));
        if inserted {
            Ok(Self { slot })
        } else {
            Err(DiError::circular(key))
        }
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        RESOLVING.with(|resolving| {
            resolving.borrow_mut().remove(&self.slot);
        });
    }
}
