//! Integration tests for the logging pipeline
//!
//! These tests verify:
//! - Logger → queue → listener → JSON line, end to end
//! - Extra value rendering (sets, dates, registered types)
//! - Error traces taking priority over stack dumps
//! - Encoder and sink failures degrading instead of propagating

use rust_queue_logger::appenders::{StreamAppender, StreamTarget};
use rust_queue_logger::core::diagnostics::{self, Diagnostic, Severity};
use rust_queue_logger::{
    error, info, register_encoder, ChannelQueue, EncoderRegistry, EventQueue, FieldValue,
    JsonFormatter, LogLevel, LoggerError, LoggerRegistry, QueueHandler, QueueListener,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tests that install a diagnostics hook must not overlap
static SERIAL: Mutex<()> = Mutex::new(());

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("one JSON object per line"))
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Pipeline {
    registry: LoggerRegistry,
    listener: QueueListener,
    output: SharedBuffer,
}

fn pipeline(encoders: Arc<EncoderRegistry>) -> Pipeline {
    let queue: Arc<dyn EventQueue> = Arc::new(ChannelQueue::unbounded());
    let output = SharedBuffer::default();
    let listener = QueueListener::builder()
        .queue(Arc::clone(&queue))
        .appender(
            StreamAppender::new(StreamTarget::writer(output.clone()))
                .with_formatter(JsonFormatter::with_registry(encoders)),
        )
        .poll_interval(Duration::from_millis(10))
        .build();

    let registry = LoggerRegistry::new();
    registry.root().set_level(LogLevel::NOTSET);
    registry
        .root()
        .add_handler(Arc::new(QueueHandler::with_queue(queue)));

    Pipeline {
        registry,
        listener,
        output,
    }
}

fn capture_diagnostics() -> Arc<Mutex<Vec<Diagnostic>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    diagnostics::set_hook(Arc::new(move |d: &Diagnostic| {
        sink.lock().unwrap().push(d.clone())
    }));
    seen
}

#[derive(Debug)]
struct Celsius(f64);

#[derive(Debug)]
struct Fahrenheit(f64);

#[test]
fn test_end_to_end_json_line() {
    let p = pipeline(Arc::new(EncoderRegistry::new()));
    p.listener.start().unwrap();

    let logger = p.registry.get("svc");
    let line = line!() + 1;
    info!(logger, "started");

    p.listener.stop().unwrap();

    let lines = p.output.lines();
    assert_eq!(lines.len(), 1);
    let entry = &lines[0];
    let keys: HashSet<&str> = entry.as_object().unwrap().keys().map(String::as_str).collect();
    let expected: HashSet<&str> = [
        "logger_name",
        "level",
        "timestamp",
        "message",
        "pathname",
        "module",
        "function",
        "line",
        "traceback",
    ]
    .into_iter()
    .collect();
    assert_eq!(keys, expected);

    assert_eq!(entry["logger_name"], "svc");
    assert_eq!(entry["level"], "INFO");
    assert_eq!(entry["message"], "started");
    assert_eq!(entry["pathname"], file!());
    assert_eq!(entry["module"], module_path!());
    assert_eq!(entry["function"], "test_end_to_end_json_line");
    assert_eq!(entry["line"], json!(line));
    assert_eq!(entry["traceback"], Value::Null);

    let timestamp = entry["timestamp"].as_str().unwrap();
    assert_eq!(timestamp.len(), "2025-01-08T10:30:45.123+00:00".len());
    assert!(timestamp.ends_with("+00:00"));
}

#[test]
fn test_extra_values_render() {
    let p = pipeline(Arc::new(EncoderRegistry::new()));
    p.listener.start().unwrap();

    let set: HashSet<i64> = [1, 2, 3].into_iter().collect();
    p.registry
        .get("svc")
        .event(LogLevel::INFO)
        .field("k", set)
        .field("when", chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        .field("levelname", "reserved keys are dropped")
        .message("with extra");
    p.listener.stop().unwrap();

    let lines = p.output.lines();
    let extra = lines[0]["extra"].as_object().unwrap();
    assert_eq!(extra.len(), 2);
    let mut items: Vec<i64> = extra["k"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    items.sort_unstable();
    assert_eq!(items, vec![1, 2, 3]);
    assert_eq!(extra["when"], "2023-01-01");
}

#[test]
fn test_exception_trace_wins_over_stack_dump() {
    let p = pipeline(Arc::new(EncoderRegistry::new()));
    p.listener.start().unwrap();

    let inner = io::Error::new(io::ErrorKind::Other, "division by zero");
    let outer = LoggerError::io_operation("computing ratio", "failed", inner);
    p.registry
        .get("svc")
        .event(LogLevel::ERROR)
        .error(&outer)
        .stack_info()
        .message("calculation failed");
    p.registry
        .get("svc")
        .event(LogLevel::WARNING)
        .stack_info()
        .message("only a stack");
    p.listener.stop().unwrap();

    let lines = p.output.lines();
    let trace = lines[0]["traceback"].as_str().unwrap();
    assert!(trace.starts_with("Error: IO error while computing ratio: failed"));
    assert!(trace.contains("Caused by:\n    0: division by zero"));
    assert!(!trace.contains("Stack backtrace"));

    let stack = lines[1]["traceback"].as_str().unwrap();
    assert!(stack.starts_with("Stack backtrace:"));
    assert_ne!(trace, stack);
}

#[test]
fn test_message_is_rendered_before_enqueue() {
    let p = pipeline(Arc::new(EncoderRegistry::new()));
    let logger = p.registry.get("svc");

    let mut state = vec![1, 2];
    info!(logger, "state={:?}", state);
    state.push(3);

    p.listener.start().unwrap();
    p.listener.stop().unwrap();

    assert_eq!(p.output.lines()[0]["message"], "state=[1, 2]");
    assert_eq!(state.len(), 3);
}

#[test]
fn test_encoder_is_matched_by_exact_type() {
    let encoders = Arc::new(EncoderRegistry::new());
    encoders.register(|c: &Celsius| json!({ "celsius": c.0 }));
    let p = pipeline(Arc::clone(&encoders));
    p.listener.start().unwrap();

    p.registry
        .get("svc")
        .event(LogLevel::INFO)
        .field("indoor", FieldValue::opaque(Celsius(21.5)))
        .field("outdoor", FieldValue::opaque(Fahrenheit(50.0)))
        .message("temperatures");

    encoders.register(|c: &Celsius| json!(format!("{}C", c.0)));
    p.registry
        .get("svc")
        .event(LogLevel::INFO)
        .field("indoor", FieldValue::opaque(Celsius(21.5)))
        .message("after re-registration");
    p.listener.stop().unwrap();

    let lines = p.output.lines();
    assert_eq!(lines[0]["extra"]["indoor"], json!({ "celsius": 21.5 }));
    assert_eq!(lines[0]["extra"]["outdoor"], "Fahrenheit(50.0)");
    assert_eq!(lines[1]["extra"]["indoor"], "21.5C");
}

#[test]
fn test_global_encoder_registration() {
    #[derive(Debug)]
    struct Meters(u32);

    register_encoder(|m: &Meters| json!(format!("{}m", m.0)));
    let rendered = JsonFormatter::new().render_value(&FieldValue::opaque(Meters(3)));
    assert_eq!(rendered, "3m");
}

#[test]
fn test_failing_encoder_warns_and_falls_back() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let seen = capture_diagnostics();

    let encoders = Arc::new(EncoderRegistry::new());
    encoders.register_fallible(|_: &Celsius| Err::<Value, _>("sensor offline"));
    let p = pipeline(encoders);
    p.listener.start().unwrap();
    p.registry
        .get("svc")
        .event(LogLevel::INFO)
        .field("indoor", FieldValue::opaque(Celsius(19.0)))
        .message("still delivered");
    p.listener.stop().unwrap();
    diagnostics::clear_hook();

    let lines = p.output.lines();
    assert_eq!(lines[0]["message"], "still delivered");
    assert_eq!(lines[0]["extra"]["indoor"], "Celsius(19.0)");

    let seen = seen.lock().unwrap();
    let warning = seen
        .iter()
        .find(|d| d.message.contains("sensor offline"))
        .expect("encoder failure reported");
    assert_eq!(warning.severity, Severity::Warning);
    assert!(warning.to_string().starts_with("[LOGGER WARNING]"));
}

#[test]
fn test_sink_failure_goes_to_diagnostics() {
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "collector gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let seen = capture_diagnostics();

    let queue: Arc<dyn EventQueue> = Arc::new(ChannelQueue::unbounded());
    let output = SharedBuffer::default();
    let listener = QueueListener::builder()
        .queue(Arc::clone(&queue))
        .appender(StreamAppender::new(StreamTarget::writer(Closed)).with_name("closed"))
        .appender(StreamAppender::new(StreamTarget::writer(output.clone())))
        .build();
    let registry = LoggerRegistry::new();
    let logger = registry.get("svc");
    logger.add_handler(Arc::new(QueueHandler::with_queue(queue)));

    listener.start().unwrap();
    error!(logger, "write me twice");
    listener.stop().unwrap();
    diagnostics::clear_hook();

    assert_eq!(output.lines()[0]["message"], "write me twice");
    let seen = seen.lock().unwrap();
    assert!(seen
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("'closed' failed")));
    assert_eq!(listener.metrics().sink_failures(), 1);
}
