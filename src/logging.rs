//! Log subscriber setup
//!
//! The container emits `tracing` events under the `tiny_ioc` target whenever
//! the `logging` feature is on. Installing a subscriber is up to the
//! application; this module offers a ready-made one when `logging-json` or
//! `logging-pretty` is enabled.
//!
//! | Level   | Events                                                     |
//! |---------|------------------------------------------------------------|
//! | `DEBUG` | containers and scopes created, builders registered, compilation, misses |
//! | `TRACE` | cache hits and misses, factory calls, ambient stack push/pop |
//!
//! ```rust,ignore
//! use tiny_ioc::logging;
//!
//! // JSON with `logging-json`, pretty otherwise
//! logging::init();
//!
//! // Only container events, at TRACE, with thread ids
//! logging::builder()
//!     .trace()
//!     .container_only()
//!     .with_thread_ids()
//!     .pretty()
//!     .init();
//! ```
//!
//! `RUST_LOG`, when set, overrides the level and target filter.

#[cfg(feature = "logging")]
use tracing::Level;

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, colored
    Pretty,
    /// Single line per event
    Compact,
}

/// Subscriber configuration
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    respect_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: if cfg!(feature = "logging-json") {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            target: None,
            respect_env: true,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Keep only events whose target starts with `target`.
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Keep only this crate's events.
    pub fn container_only(self) -> Self {
        self.with_target_filter("tiny_ioc")
    }

    /// Ignore `RUST_LOG` even when it is set.
    pub fn ignore_env(mut self) -> Self {
        self.respect_env = false;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive built from level and target, e.g. `tiny_ioc=trace`.
    pub fn directive(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the subscriber globally.
    ///
    /// Returns `false` if a global subscriber was already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> bool {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = self
            .respect_env
            .then(|| EnvFilter::try_from_default_env().ok())
            .flatten()
            .unwrap_or_else(|| EnvFilter::new(self.directive()));

        let layer = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_target(true);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        };

        tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_ok()
    }

    /// No subscriber is available without `logging-json` or `logging-pretty`.
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn try_init(self) -> bool {
        false
    }

    /// Install the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }
}

#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install the default subscriber at DEBUG.
#[cfg(feature = "logging")]
pub fn init() {
    builder().init();
}

/// Install a JSON subscriber at DEBUG.
#[cfg(feature = "logging")]
pub fn init_json() {
    builder().json().init();
}

/// Install a pretty subscriber at DEBUG.
#[cfg(feature = "logging")]
pub fn init_pretty() {
    builder().pretty().init();
}

/// Install a subscriber showing container events only.
#[cfg(feature = "logging")]
pub fn init_container_only() {
    builder().container_only().init();
}

#[cfg(all(test, feature = "logging"))]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert!(builder.target.is_none());
        assert!(builder.respect_env);
        assert_eq!(builder.directive(), "debug");
    }

    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new()
            .trace()
            .compact()
            .with_file()
            .with_line_number()
            .container_only()
            .ignore_env();

        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Compact);
        assert!(builder.with_file);
        assert!(builder.with_line_number);
        assert!(!builder.respect_env);
        assert_eq!(builder.directive(), "tiny_ioc=trace");
    }
}
