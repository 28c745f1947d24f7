//! Named loggers and the producer-side logging API
//!
//! Loggers form a dotted-name hierarchy under a root logger. A record
//! passes the level check of the logger it was issued on, then goes to the
//! handlers of that logger and, while `propagate` is set, of its ancestors.

use super::diagnostics;
use super::field_value::FieldValue;
use super::handler::Handler;
use super::log_event::{capture_stack_info, Location, Record};
use super::log_level::LogLevel;
use super::runtime::Runtime;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

pub const ROOT_LOGGER_NAME: &str = "root";

pub struct Logger {
    name: String,
    /// NOTSET defers to the parent
    level: AtomicU32,
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
    propagate: AtomicBool,
    disabled: AtomicBool,
    parent: Option<Arc<Logger>>,
}

impl Logger {
    fn new(name: &str, parent: Option<Arc<Logger>>, level: LogLevel) -> Self {
        Self {
            name: name.to_string(),
            level: AtomicU32::new(level.value()),
            handlers: RwLock::new(Vec::new()),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Logger>> {
        self.parent.as_ref()
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::new(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level.value(), Ordering::Relaxed);
    }

    /// First level set on this logger or an ancestor
    pub fn effective_level(&self) -> LogLevel {
        let mut current = Some(self);
        while let Some(logger) = current {
            let level = logger.level();
            if level != LogLevel::NOTSET {
                return level;
            }
            current = logger.parent.as_deref();
        }
        LogLevel::NOTSET
    }

    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        !self.is_disabled() && level >= self.effective_level()
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Relaxed)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Relaxed);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.handlers.write().push(handler);
    }

    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.handlers.read().clone()
    }

    /// Hand a record to this logger's handlers and, while propagating, to
    /// its ancestors' handlers. Handler failures go to diagnostics.
    pub fn handle(&self, record: &Record<'_>) {
        let mut current = Some(self);
        while let Some(logger) = current {
            for handler in logger.handlers() {
                if record.level < handler.level() {
                    continue;
                }
                if let Err(e) = handler.handle(record) {
                    diagnostics::error(format!(
                        "Handler '{}' on logger '{}' failed: {}",
                        handler.name(),
                        logger.name,
                        e
                    ));
                }
            }
            if !logger.propagate() {
                break;
            }
            current = logger.parent.as_deref();
        }
    }

    /// Start building an event at the caller's location
    #[track_caller]
    pub fn event(&self, level: LogLevel) -> EventBuilder<'_> {
        EventBuilder {
            logger: self,
            level,
            location: Location::caller(),
            error: None,
            stack_info: false,
            extra: Vec::new(),
        }
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.event(level).emit(format_args!("{}", message));
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl fmt::Display) {
        self.log(LogLevel::TRACE, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::DEBUG, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::INFO, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::WARNING, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::ERROR, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(LogLevel::CRITICAL, message);
    }

    /// Log at ERROR with the error's trace attached
    #[track_caller]
    pub fn exception(&self, err: &(dyn Error + 'static), message: impl fmt::Display) {
        self.event(LogLevel::ERROR)
            .error(err)
            .emit(format_args!("{}", message));
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("propagate", &self.propagate())
            .field("disabled", &self.is_disabled())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

/// Fluent construction of one logging call
///
/// # Example
///
/// ```
/// use rust_queue_logger::{get_logger, LogLevel};
///
/// let logger = get_logger("billing");
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "card declined");
/// logger
///     .event(LogLevel::ERROR)
///     .error(&err)
///     .field("order_id", 1042)
///     .emit(format_args!("charge failed after {} attempts", 3));
/// ```
#[must_use = "an event is only logged when `emit` is called"]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    location: Location<'static>,
    error: Option<&'a (dyn Error + 'static)>,
    stack_info: bool,
    extra: Vec<(String, FieldValue)>,
}

impl<'a> EventBuilder<'a> {
    /// Attach an error; its trace is rendered when the event is captured
    pub fn error(mut self, err: &'a (dyn Error + 'static)) -> Self {
        self.error = Some(err);
        self
    }

    /// Capture the current call stack with the event
    pub fn stack_info(mut self) -> Self {
        self.stack_info = true;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Override the call site recorded by [`Logger::event`]
    pub fn location(
        mut self,
        file: &'static str,
        line: u32,
        module: &'static str,
        function: &'static str,
    ) -> Self {
        self.location = Location {
            file,
            line,
            module: Some(module),
            function: Some(function),
        };
        self
    }

    pub fn emit(self, args: fmt::Arguments<'_>) {
        if !self.logger.is_enabled_for(self.level) {
            return;
        }

        let record = Record {
            logger_name: self.logger.name(),
            level: self.level,
            args,
            location: self.location,
            error: self.error,
            stack_info: self.stack_info.then(capture_stack_info),
            extra: &self.extra,
        };
        self.logger.handle(&record);
    }

    pub fn message(self, message: &str) {
        self.emit(format_args!("{}", message));
    }
}

/// Owns every named logger of a process
pub struct LoggerRegistry {
    root: Arc<Logger>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self {
            root: Arc::new(Logger::new(ROOT_LOGGER_NAME, None, LogLevel::WARNING)),
            loggers: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// Get or create the logger for a dotted name; `""` and `"root"` are
    /// the root logger. Missing ancestors are created on the way.
    pub fn get(&self, name: &str) -> Arc<Logger> {
        if name.is_empty() || name == ROOT_LOGGER_NAME {
            return self.root();
        }
        if let Some(logger) = self.loggers.read().get(name) {
            return Arc::clone(logger);
        }

        let parent = match name.rsplit_once('.') {
            Some((parent, _)) => self.get(parent),
            None => self.root(),
        };
        let mut loggers = self.loggers.write();
        Arc::clone(
            loggers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Logger::new(name, Some(parent), LogLevel::NOTSET))),
        )
    }

    /// All non-root loggers created so far
    pub fn loggers(&self) -> Vec<Arc<Logger>> {
        self.loggers.read().values().cloned().collect()
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Logger for `name` from the process-wide registry
pub fn get_logger(name: &str) -> Arc<Logger> {
    Runtime::global().loggers().get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use crate::core::log_event::LogEvent;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        events: Mutex<Vec<LogEvent>>,
        level: LogLevel,
    }

    impl Handler for Capture {
        fn handle(&self, record: &Record<'_>) -> Result<()> {
            self.events.lock().push(LogEvent::capture(record));
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }

        fn level(&self) -> LogLevel {
            self.level
        }
    }

    #[test]
    fn test_hierarchy_and_effective_level() {
        let registry = LoggerRegistry::new();
        let child = registry.get("app.db.pool");
        let parent = registry.get("app.db");

        assert!(Arc::ptr_eq(child.parent().unwrap(), &parent));
        assert_eq!(child.effective_level(), LogLevel::WARNING);

        parent.set_level(LogLevel::DEBUG);
        assert_eq!(child.effective_level(), LogLevel::DEBUG);
        assert!(child.is_enabled_for(LogLevel::DEBUG));
        assert!(!child.is_enabled_for(LogLevel::TRACE));
    }

    #[test]
    fn test_root_aliases() {
        let registry = LoggerRegistry::new();
        assert!(Arc::ptr_eq(&registry.get(""), &registry.root()));
        assert!(Arc::ptr_eq(&registry.get("root"), &registry.root()));
        assert!(Arc::ptr_eq(&registry.get("a"), &registry.get("a")));
    }

    #[test]
    fn test_level_filter_and_propagation() {
        let registry = LoggerRegistry::new();
        let logger = registry.get("svc");
        logger.set_level(LogLevel::INFO);

        let own = Arc::new(Capture::default());
        let root = Arc::new(Capture::default());
        logger.add_handler(own.clone());
        registry.root().add_handler(root.clone());

        logger.info("Test info");
        logger.debug("Test debug");
        assert_eq!(own.events.lock().len(), 1);
        assert_eq!(root.events.lock().len(), 1);

        logger.set_propagate(false);
        logger.info("only local");
        assert_eq!(own.events.lock().len(), 2);
        assert_eq!(root.events.lock().len(), 1);
    }

    #[test]
    fn test_handler_level_is_respected() {
        let registry = LoggerRegistry::new();
        let logger = registry.get("svc");
        logger.set_level(LogLevel::DEBUG);
        let capture = Arc::new(Capture {
            level: LogLevel::WARNING,
            ..Capture::default()
        });
        logger.add_handler(capture.clone());

        logger.info("ignored");
        logger.warn("kept");
        let events = capture.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "kept");
    }

    #[test]
    fn test_disabled_logger_drops_everything() {
        let registry = LoggerRegistry::new();
        let logger = registry.get("svc");
        let capture = Arc::new(Capture::default());
        logger.add_handler(capture.clone());
        logger.set_disabled(true);

        logger.critical("nobody hears this");
        assert!(capture.events.lock().is_empty());
    }

    #[test]
    fn test_event_builder_records_call_site() {
        let registry = LoggerRegistry::new();
        let logger = registry.get("svc");
        logger.set_level(LogLevel::INFO);
        let capture = Arc::new(Capture::default());
        logger.add_handler(capture.clone());

        let line = line!() + 1;
        logger.event(LogLevel::INFO).field("user", "ann").message("login");

        let events = capture.events.lock();
        assert_eq!(events[0].pathname, file!());
        assert_eq!(events[0].line, line);
        assert!(events[0].extra.contains_key("user"));
    }

    #[test]
    fn test_stack_info_only_captured_when_enabled() {
        let registry = LoggerRegistry::new();
        let logger = registry.get("svc");
        logger.set_level(LogLevel::ERROR);
        let capture = Arc::new(Capture::default());
        logger.add_handler(capture.clone());

        logger.event(LogLevel::INFO).stack_info().message("filtered");
        logger.event(LogLevel::ERROR).stack_info().message("kept");

        let events = capture.events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].stack_info.as_deref().unwrap().starts_with("Stack backtrace:"));
    }
}
