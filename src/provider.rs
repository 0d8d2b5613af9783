//! Provider traits for dependency injection
//!
//! These traits define what types can be injected and how they behave.

/// Marker trait for types that can be resolved from a container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`,
/// including trait objects such as `dyn Logger + Send + Sync`.
pub trait Injectable: Send + Sync + 'static {
    /// Returns the type name for debugging
    #[inline]
    fn type_name_of() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// How long a resolved component is reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance per root container, shared by every scope below it
    Singleton,

    /// One instance per container (root or scope)
    Scoped,

    /// New instance created on every resolve
    #[default]
    Transient,
}

impl Lifetime {
    /// Lowercase name used in logs.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetime_is_transient() {
        assert_eq!(Lifetime::default(), Lifetime::Transient);
    }

    #[test]
    fn test_lifetime_display() {
        assert_eq!(Lifetime::Singleton.to_string(), "singleton");
        assert_eq!(Lifetime::Scoped.to_string(), "scoped");
        assert_eq!(Lifetime::Transient.to_string(), "transient");
    }
}
