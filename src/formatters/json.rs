//! Structured JSON rendering of log events
//!
//! One event becomes one single-line JSON object:
//!
//! ```text
//! {"logger_name":"svc","level":"INFO","timestamp":"2025-01-08T10:30:45.123+00:00",
//!  "message":"started","pathname":"src/main.rs","module":"main","function":"run",
//!  "line":12,"traceback":null}
//! ```
//!
//! `extra` is appended only when the event carries non-reserved extra fields.

use super::{Formatter, TIMESTAMP_FORMAT};
use crate::core::{diagnostics, EncoderRegistry, FieldValue, LogEvent, OpaqueValue, Result};
use crate::core::runtime::Runtime;
use chrono::{SecondsFormat, Timelike};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

#[derive(Serialize)]
struct JsonLine<'a> {
    logger_name: &'a str,
    level: &'a str,
    timestamp: String,
    message: &'a str,
    pathname: &'a str,
    module: &'a str,
    function: &'a str,
    line: u32,
    traceback: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<Map<String, Value>>,
}

/// JSON formatter backed by an encoder registry.
///
/// Uses the process-wide registry unless another one is supplied.
#[derive(Clone)]
pub struct JsonFormatter {
    registry: Arc<EncoderRegistry>,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            registry: Runtime::global().encoders(),
        }
    }

    #[must_use]
    pub fn with_registry(registry: Arc<EncoderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<EncoderRegistry> {
        &self.registry
    }

    /// Render a single extra value
    pub fn render_value(&self, value: &FieldValue) -> Value {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::UInt(u) => Value::Number((*u).into()),
            FieldValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::List(items) | FieldValue::Set(items) => {
                Value::Array(items.iter().map(|v| self.render_value(v)).collect())
            }
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.render_value(v)))
                    .collect(),
            ),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(dt) => {
                let precision = if dt.nanosecond() / 1_000 == 0 {
                    SecondsFormat::Secs
                } else {
                    SecondsFormat::Micros
                };
                Value::String(dt.to_rfc3339_opts(precision, false))
            }
            FieldValue::NaiveDateTime(dt) => {
                let pattern = if dt.nanosecond() / 1_000 == 0 {
                    "%Y-%m-%dT%H:%M:%S"
                } else {
                    "%Y-%m-%dT%H:%M:%S%.6f"
                };
                Value::String(dt.format(pattern).to_string())
            }
            FieldValue::Opaque(opaque) => self.render_opaque(opaque),
        }
    }

    fn render_opaque(&self, value: &OpaqueValue) -> Value {
        match self.registry.encode(value) {
            Some(Ok(encoded)) => encoded,
            Some(Err(e)) => {
                diagnostics::warn(format!(
                    "{}. Falling back to the string representation.",
                    e
                ));
                Value::String(value.repr().to_string())
            }
            None => Value::String(value.repr().to_string()),
        }
    }

    fn render_extra(&self, event: &LogEvent) -> Option<Map<String, Value>> {
        let extra: Map<String, Value> = event
            .extra_fields()
            .map(|(key, value)| (key.clone(), self.render_value(value)))
            .collect();
        if extra.is_empty() {
            None
        } else {
            Some(extra)
        }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, event: &LogEvent) -> Result<String> {
        let level = event.level.name();
        let line = JsonLine {
            logger_name: &event.logger_name,
            level: &level,
            timestamp: event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            message: &event.message,
            pathname: &event.pathname,
            module: &event.module,
            function: &event.function,
            line: event.line,
            traceback: event.traceback(),
            extra: self.render_extra(event),
        };
        Ok(serde_json::to_string(&line)?)
    }
}
