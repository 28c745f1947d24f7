//! Formatters turning a log event into one line of text

pub mod json;
pub mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::core::{LogEvent, Result};

pub trait Formatter: Send + Sync {
    fn format(&self, event: &LogEvent) -> Result<String>;
}

/// `YYYY-MM-DDTHH:MM:SS.mmm+00:00`
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f+00:00";
