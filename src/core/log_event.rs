//! Log event snapshot and the call-site record it is captured from

use super::diagnostics;
use super::error::panic_message;
use super::field_value::FieldValue;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Write as _};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

/// Names an extra field may not use; they collide with built-in event
/// attributes and are left out of the rendered `extra` object.
pub const RESERVED_ATTRS: &[&str] = &[
    "args",
    "asctime",
    "created",
    "exc_info",
    "exc_text",
    "extra",
    "filename",
    "funcName",
    "function",
    "id",
    "level",
    "levelname",
    "levelno",
    "line",
    "lineno",
    "logger_name",
    "message",
    "module",
    "msecs",
    "msg",
    "name",
    "pathname",
    "process",
    "processName",
    "process_id",
    "process_name",
    "props",
    "relativeCreated",
    "relative_created",
    "sequence",
    "stack_info",
    "thread",
    "threadName",
    "thread_id",
    "thread_name",
    "timestamp",
    "traceback",
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_ATTRS.contains(&key)
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

fn get_process_name() -> &'static str {
    static NAME: OnceLock<String> = OnceLock::new();
    NAME.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "main".to_string())
    })
}

/// Where a logging call was made
#[derive(Debug, Clone, Copy)]
pub struct Location<'a> {
    pub file: &'a str,
    pub line: u32,
    /// Module path; the file stem is used when absent
    pub module: Option<&'a str>,
    pub function: Option<&'a str>,
}

impl Location<'static> {
    #[track_caller]
    pub fn caller() -> Self {
        let caller = std::panic::Location::caller();
        Location {
            file: caller.file(),
            line: caller.line(),
            module: None,
            function: None,
        }
    }
}

/// A logging call as seen at the call site, before snapshotting.
///
/// Borrows the format arguments and the error, neither of which may outlive
/// the call; [`LogEvent::capture`] turns it into an owned event.
pub struct Record<'a> {
    pub logger_name: &'a str,
    pub level: LogLevel,
    pub args: fmt::Arguments<'a>,
    pub location: Location<'a>,
    pub error: Option<&'a (dyn Error + 'static)>,
    pub stack_info: Option<String>,
    pub extra: &'a [(String, FieldValue)],
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("logger_name", &self.logger_name)
            .field("level", &self.level)
            .field("args", &self.args)
            .field("location", &self.location)
            .field("error", &self.error.map(|e| e.to_string()))
            .field("extra", &self.extra)
            .finish()
    }
}

/// Render an error and its source chain
pub fn render_error_trace(err: &(dyn Error + 'static)) -> String {
    let mut out = format!("Error: {}", err);
    let mut source = err.source();
    if source.is_some() {
        out.push_str("\n\nCaused by:");
    }
    let mut idx = 0;
    while let Some(cause) = source {
        let _ = write!(out, "\n    {}: {}", idx, cause);
        idx += 1;
        source = cause.source();
    }
    out
}

/// Run a rendering step on the caller's thread; a panicking `Display`
/// impl is reported to diagnostics and replaced by a placeholder.
fn render_guarded(what: &str, logger_name: &str, render: impl FnOnce() -> String) -> String {
    match catch_unwind(AssertUnwindSafe(render)) {
        Ok(text) => text,
        Err(payload) => {
            let reason = panic_message(&*payload);
            diagnostics::error(format!(
                "Rendering the {} for logger '{}' panicked: {}",
                what, logger_name, reason
            ));
            format!("<{} unavailable: {}>", what, reason)
        }
    }
}

/// Capture the current call stack as text
pub fn capture_stack_info() -> String {
    format!("Stack backtrace:\n{}", Backtrace::force_capture())
}

/// Immutable snapshot of one logging call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub sequence: u64,
    pub logger_name: String,
    pub level: LogLevel,
    /// Fully rendered message
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Monotonic time since process start
    pub relative_created: Duration,
    pub pathname: String,
    pub filename: String,
    pub module: String,
    pub function: String,
    pub line: u32,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub process_id: u32,
    pub process_name: String,
    /// Pre-rendered error trace
    pub exc_text: Option<String>,
    /// Pre-rendered call stack
    pub stack_info: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, FieldValue>,
}

impl LogEvent {
    pub fn new(logger_name: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            logger_name: logger_name.into(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            relative_created: super::runtime::Runtime::global().uptime(),
            pathname: String::new(),
            filename: String::new(),
            module: String::new(),
            function: String::new(),
            line: 0,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            process_id: std::process::id(),
            process_name: get_process_name().to_string(),
            exc_text: None,
            stack_info: None,
            extra: BTreeMap::new(),
        }
    }

    /// Snapshot a record: the message is formatted and the error trace is
    /// rendered here, so nothing borrowed from the call site survives.
    pub fn capture(record: &Record<'_>) -> Self {
        let message = render_guarded("message", record.logger_name, || record.args.to_string());
        let mut event =
            Self::new(record.logger_name, record.level, message).with_location(record.location);

        event.exc_text = record
            .error
            .map(|err| render_guarded("error trace", record.logger_name, || render_error_trace(err)));
        event.stack_info = record.stack_info.clone();
        for (key, value) in record.extra {
            event.extra.insert(key.clone(), value.clone());
        }
        event
    }

    pub fn with_location(mut self, location: Location<'_>) -> Self {
        let path = Path::new(location.file);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.pathname = location.file.to_string();
        self.filename = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.module = location.module.map(str::to_string).unwrap_or(stem);
        self.function = location.function.unwrap_or("<unknown>").to_string();
        self.line = location.line;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_exc_text(mut self, text: impl Into<String>) -> Self {
        self.exc_text = Some(text.into());
        self
    }

    pub fn with_stack_info(mut self, text: impl Into<String>) -> Self {
        self.stack_info = Some(text.into());
        self
    }

    /// Error trace if present, otherwise the captured stack
    pub fn traceback(&self) -> Option<&str> {
        self.exc_text.as_deref().or(self.stack_info.as_deref())
    }

    /// Extra fields excluding reserved attribute names
    pub fn extra_fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.extra.iter().filter(|(key, _)| !is_reserved(key))
    }

    pub fn has_extra_fields(&self) -> bool {
        self.extra_fields().next().is_some()
    }
}
