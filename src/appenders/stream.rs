//! Stream appender: formatter + writable stream + level floor

use crate::core::{Appender, LogEvent, LogLevel, Result};
use crate::formatters::{Formatter, JsonFormatter};
use std::io::{self, Write};

/// Where a stream appender writes
pub enum StreamTarget {
    Stderr,
    Stdout,
    Writer(Box<dyn Write + Send>),
}

impl StreamTarget {
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        StreamTarget::Writer(Box::new(writer))
    }

    fn label(&self) -> &'static str {
        match self {
            StreamTarget::Stderr => "stderr",
            StreamTarget::Stdout => "stdout",
            StreamTarget::Writer(_) => "writer",
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            StreamTarget::Stderr => {
                let mut handle = io::stderr().lock();
                writeln!(handle, "{}", line)?;
                handle.flush()
            }
            StreamTarget::Stdout => {
                let mut handle = io::stdout().lock();
                writeln!(handle, "{}", line)?;
                handle.flush()
            }
            StreamTarget::Writer(writer) => {
                writeln!(writer, "{}", line)?;
                writer.flush()
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamTarget::Stderr => io::stderr().flush(),
            StreamTarget::Stdout => io::stdout().flush(),
            StreamTarget::Writer(writer) => writer.flush(),
        }
    }
}

impl Default for StreamTarget {
    fn default() -> Self {
        StreamTarget::Stderr
    }
}

impl std::fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Writes one formatted line per event and flushes it immediately.
///
/// # Example
///
/// ```
/// use rust_queue_logger::appenders::{StreamAppender, StreamTarget};
/// use rust_queue_logger::LogLevel;
///
/// let appender = StreamAppender::new(StreamTarget::Stdout).with_min_level(LogLevel::INFO);
/// ```
pub struct StreamAppender {
    name: String,
    target: StreamTarget,
    formatter: Box<dyn Formatter>,
    min_level: LogLevel,
}

impl StreamAppender {
    /// JSON-formatted appender accepting every level
    pub fn new(target: StreamTarget) -> Self {
        Self {
            name: format!("stream:{}", target.label()),
            target,
            formatter: Box::new(JsonFormatter::new()),
            min_level: LogLevel::NOTSET,
        }
    }

    pub fn stderr() -> Self {
        Self::new(StreamTarget::Stderr)
    }

    #[must_use]
    pub fn with_formatter<F: Formatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for StreamAppender {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Appender for StreamAppender {
    fn append(&mut self, event: &LogEvent) -> Result<()> {
        let line = self.formatter.format(event)?;
        self.target.write_line(&line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.target.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
