//! Run a unit of application logic inside a started listener
//!
//! The configuration is resolved and applied first; any error there is
//! returned before the listener starts. The listener is stopped on every
//! way out, so queued events are written before the caller continues.

use super::config::ConfigSource;
use super::diagnostics;
use super::error::Result;
use super::listener::QueueListener;
use super::runtime::Runtime;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// # Example
///
/// ```
/// use rust_queue_logger::{get_logger, Entrypoint, LoggingConfig};
/// use serde_json::json;
///
/// let config = LoggingConfig::from_value(json!({
///     "version": 1,
///     "handlers": { "queue": { "class": "queue" } },
///     "root": { "level": "INFO", "handlers": ["queue"] }
/// }))
/// .unwrap();
///
/// let answer = Entrypoint::new(config)
///     .run(|| {
///         get_logger("app").info("working");
///         42
///     })
///     .unwrap();
/// assert_eq!(answer, 42);
/// ```
pub struct Entrypoint {
    source: ConfigSource,
    listener: Option<Arc<QueueListener>>,
}

impl Entrypoint {
    pub fn new(source: impl Into<ConfigSource>) -> Self {
        Self {
            source: source.into(),
            listener: None,
        }
    }

    /// Use `listener` instead of the process-wide one
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<QueueListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Configure, start the listener, run `f`, stop the listener.
    ///
    /// A panic in `f` is resumed after the listener has stopped. If `f`
    /// returns normally but stopping fails, the stop error is returned.
    pub fn run<F, R>(self, f: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let config = self.source.resolve()?;
        config.apply(Runtime::global().loggers())?;

        let listener = self.listener.unwrap_or_else(QueueListener::instance);
        listener.start()?;

        let outcome = catch_unwind(AssertUnwindSafe(f));
        let stopped = listener.stop();

        match outcome {
            Ok(value) => stopped.map(|()| value),
            Err(payload) => {
                if let Err(e) = stopped {
                    diagnostics::error(format!("Listener stop after panic failed: {}", e));
                }
                resume_unwind(payload)
            }
        }
    }
}

/// Shorthand for `Entrypoint::new(source).run(f)`
pub fn entrypoint<F, R>(source: impl Into<ConfigSource>, f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    Entrypoint::new(source).run(f)
}
