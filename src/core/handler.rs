//! Producer-side handlers attached to loggers

use super::appender::Appender;
use super::error::Result;
use super::log_event::{LogEvent, Record};
use super::log_level::LogLevel;
use super::queue::{EventQueue, QueueItem};
use super::runtime::Runtime;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives records from loggers on the caller's thread
pub trait Handler: Send + Sync {
    fn handle(&self, record: &Record<'_>) -> Result<()>;
    fn name(&self) -> &str;

    fn level(&self) -> LogLevel {
        LogLevel::NOTSET
    }
}

/// Snapshots records and pushes them onto an event queue.
///
/// This is the only work done on the application thread: formatting the
/// message and rendering the error trace. JSON rendering and I/O happen on
/// the listener worker.
pub struct QueueHandler {
    queue: Arc<dyn EventQueue>,
    level: LogLevel,
}

impl QueueHandler {
    /// Handler feeding the process-wide queue
    pub fn new() -> Self {
        Self::with_queue(Runtime::global().queue())
    }

    pub fn with_queue(queue: Arc<dyn EventQueue>) -> Self {
        Self {
            queue,
            level: LogLevel::NOTSET,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn queue(&self) -> &Arc<dyn EventQueue> {
        &self.queue
    }

    /// Build the snapshot that will be enqueued
    pub fn prepare(&self, record: &Record<'_>) -> LogEvent {
        LogEvent::capture(record)
    }
}

impl Default for QueueHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for QueueHandler {
    fn handle(&self, record: &Record<'_>) -> Result<()> {
        let event = self.prepare(record);
        self.queue.push(QueueItem::Event(event))
    }

    fn name(&self) -> &str {
        "queue"
    }

    fn level(&self) -> LogLevel {
        self.level
    }
}

/// Runs an appender synchronously on the caller's thread
pub struct AppenderHandler {
    name: String,
    appender: Mutex<Box<dyn Appender>>,
}

impl AppenderHandler {
    pub fn new<A: Appender + 'static>(appender: A) -> Self {
        Self {
            name: appender.name().to_string(),
            appender: Mutex::new(Box::new(appender)),
        }
    }
}

impl Handler for AppenderHandler {
    fn handle(&self, record: &Record<'_>) -> Result<()> {
        let event = LogEvent::capture(record);
        let mut appender = self.appender.lock();
        if event.level < appender.min_level() {
            return Ok(());
        }
        appender.append(&event)?;
        appender.flush()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn handle(&self, _record: &Record<'_>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
