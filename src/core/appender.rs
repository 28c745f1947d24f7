//! Appender trait for log output destinations

use super::{error::Result, log_event::LogEvent, log_level::LogLevel};

/// A sink the listener dispatches events to
pub trait Appender: Send {
    fn append(&mut self, event: &LogEvent) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Events below this level are not dispatched to the appender
    fn min_level(&self) -> LogLevel {
        LogLevel::NOTSET
    }
}
