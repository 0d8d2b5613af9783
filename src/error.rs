//! Error types for dependency injection

use thiserror::Error;

/// Errors that can occur while registering or resolving components
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No registration for the key in the container or any ancestor
    #[error("Component key \"{key}\" not found")]
    NotFound { key: String },

    /// A matched factory (or the lifetime cache around it) failed
    #[error("Resolve component \"{key}\" failed")]
    ResolveFailed {
        key: String,
        #[source]
        source: Box<DiError>,
    },

    /// A matched factory produced no component
    #[error("Invalid component returned from factory for \"{key}\" (registration {registration_id})")]
    InvalidComponent { key: String, registration_id: u64 },

    /// A class with constructor dependencies was registered without a key list
    #[error("Class \"{class}\" constructor arguments not found (key \"{key}\")")]
    ClassArgsNotFound { key: String, class: &'static str },

    /// `inject` was called while no container was resolving on this thread
    #[error(
        "Current container not found. Components using inject() must be constructed by a container"
    )]
    CurrentContainerNotFound,

    /// A registration was re-entered while its own factory was still running
    #[error("Circular dependency detected while resolving \"{key}\"")]
    CircularDependency { key: String },

    /// The stored component is not of the type the key promises
    #[error("Component for \"{key}\" is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A user factory failed to create its component
    #[error("Failed to create component {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Wrap a failure raised while resolving `key`
    #[inline]
    pub fn resolve_failed(key: impl ToString, cause: DiError) -> Self {
        Self::ResolveFailed {
            key: key.to_string(),
            source: Box::new(cause),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(key: impl ToString) -> Self {
        Self::CircularDependency {
            key: key.to_string(),
        }
    }

    /// The innermost failure behind any chain of `ResolveFailed` wrappers.
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let Self::ResolveFailed { source, .. } = current {
            current = source.as_ref();
        }
        current
    }

    /// True for `NotFound`.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_resolve_failed_keeps_cause() {
        let inner = DiError::not_found("Logger");
        let err = DiError::resolve_failed("Service", inner);

        let source = err.source().expect("cause preserved");
        assert_eq!(source.to_string(), "Component key \"Logger\" not found");
        assert!(err.root_cause().is_not_found());
    }

    #[test]
    fn test_root_cause_walks_nested_chain() {
        let err = DiError::resolve_failed(
            "A",
            DiError::resolve_failed(
                "B",
                DiError::ClassArgsNotFound {
                    key: "C".into(),
                    class: "C",
                },
            ),
        );

        assert!(matches!(
            err.root_cause(),
            DiError::ClassArgsNotFound { class: "C", .. }
        ));
    }

    #[test]
    fn test_creation_failed_names_type() {
        struct Database;
        let err = DiError::creation_failed::<Database>("connection refused");
        let message = err.to_string();
        assert!(message.contains("Database"));
        assert!(message.contains("connection refused"));
    }
}
