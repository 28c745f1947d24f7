//! Human-readable formatter

use super::{Formatter, JsonFormatter, TIMESTAMP_FORMAT};
use crate::core::{LogEvent, Result};
#[cfg(feature = "console")]
use colored::Colorize;

/// Renders `[timestamp] [LEVEL   ] logger - message key=value`, with the
/// traceback (if any) on the following lines.
#[derive(Clone)]
pub struct TextFormatter {
    use_colors: bool,
    values: JsonFormatter,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: false,
            values: JsonFormatter::new(),
        }
    }

    /// Color the level name; ignored without the `console` feature
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn level_label(&self, event: &LogEvent) -> String {
        let label = format!("{:8}", event.level.name());
        #[cfg(feature = "console")]
        if self.use_colors {
            return label.color(event.level.color_code()).to_string();
        }
        label
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TextFormatter {
    fn format(&self, event: &LogEvent) -> Result<String> {
        let mut out = format!(
            "[{}] [{}] {} - {}",
            event.timestamp.format(TIMESTAMP_FORMAT),
            self.level_label(event),
            event.logger_name,
            event.message
        );

        for (key, value) in event.extra_fields() {
            let rendered = match self.values.render_value(value) {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            out.push_str(&format!(" {}={}", key, rendered));
        }

        if let Some(traceback) = event.traceback() {
            out.push('\n');
            out.push_str(traceback);
        }

        Ok(out)
    }
}
