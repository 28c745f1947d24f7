//! Lifecycle tests for the process-wide listener
//!
//! These tests verify:
//! - One listener instance per process until it is reset
//! - Idempotent start and stop
//! - Drain completeness on stop
//! - Reconfiguring the singleton with a different output stream
//! - A reset that times out keeps the old instance as the singleton

use rust_queue_logger::appenders::StreamTarget;
use rust_queue_logger::core::Runtime;
use rust_queue_logger::{
    Appender, EventQueue, LogEvent, LogLevel, LoggerError, LoggerRegistry, QueueHandler,
    QueueItem, QueueListener,
};
use serde_json::Value;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Every test here touches the singleton and the process-wide queue
static SERIAL: Mutex<()> = Mutex::new(());

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn messages(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| {
                let parsed: Value = serde_json::from_str(line).unwrap();
                parsed["message"].as_str().unwrap().to_string()
            })
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

/// Fresh singleton writing JSON lines into the returned buffer
fn reset_with_buffer() -> (Arc<QueueListener>, SharedBuffer) {
    QueueListener::reset_instance().unwrap();
    let output = SharedBuffer::default();
    let stream = output.clone();
    let listener = QueueListener::get_or_init(move || {
        QueueListener::builder()
            .stream(StreamTarget::writer(stream))
            .poll_interval(Duration::from_millis(10))
    });
    (listener, output)
}

fn global_logger(registry: &LoggerRegistry, name: &str) -> Arc<rust_queue_logger::Logger> {
    let logger = registry.get(name);
    logger.set_level(LogLevel::DEBUG);
    logger.add_handler(Arc::new(QueueHandler::new()));
    logger
}

#[test]
fn test_instance_is_a_singleton() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    QueueListener::reset_instance().unwrap();

    let a = QueueListener::instance();
    let b = QueueListener::instance();
    assert!(Arc::ptr_eq(&a, &b));

    let queue = Runtime::global().queue();
    assert!(Arc::ptr_eq(a.queue(), &queue));
    assert_eq!(a.appender_names(), vec!["stream:stderr".to_string()]);

    let c = QueueListener::get_or_init(|| panic!("existing instance is reused"));
    assert!(Arc::ptr_eq(&a, &c));
}

#[test]
fn test_concurrent_first_access_yields_one_instance() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    QueueListener::reset_instance().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(QueueListener::instance))
        .collect();
    let instances: Vec<Arc<QueueListener>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let (listener, _output) = reset_with_buffer();

    listener.start().unwrap();
    let worker = listener.worker_thread_id();
    listener.start().unwrap();
    assert!(listener.is_running());
    assert_eq!(listener.worker_thread_id(), worker);

    listener.stop().unwrap();
    assert!(!listener.is_running());
    listener.stop().unwrap();
    assert!(!listener.is_running());

    listener.start().unwrap();
    assert_ne!(listener.worker_thread_id(), worker);
    listener.stop().unwrap();
}

#[test]
fn test_stop_drains_everything_pushed_before_it() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let (listener, output) = reset_with_buffer();
    let registry = LoggerRegistry::new();
    let logger = global_logger(&registry, "drain");

    listener.start().unwrap();
    for i in 0..1000 {
        logger.info(format!("event {}", i));
    }
    listener.stop().unwrap();

    let expected: Vec<String> = (0..1000).map(|i| format!("event {}", i)).collect();
    assert_eq!(output.messages(), expected);
    assert!(Runtime::global().queue().is_empty());
}

#[test]
fn test_events_logged_before_start_are_delivered() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let (listener, output) = reset_with_buffer();
    let registry = LoggerRegistry::new();
    let logger = global_logger(&registry, "early");

    logger.warn("before start");
    listener.start().unwrap();
    logger.warn("after start");
    listener.stop().unwrap();

    assert_eq!(output.messages(), vec!["before start", "after start"]);
}

#[test]
fn test_reset_allows_a_different_stream() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let registry = LoggerRegistry::new();
    let logger = global_logger(&registry, "reset");

    let (first, first_output) = reset_with_buffer();
    first.start().unwrap();
    logger.info("to first");

    let (second, second_output) = reset_with_buffer();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!first.is_running());

    second.start().unwrap();
    logger.info("to second");
    second.stop().unwrap();

    assert_eq!(first_output.messages(), vec!["to first"]);
    assert_eq!(second_output.messages(), vec!["to second"]);
}

#[derive(Clone, Default)]
struct SlowCollect(Arc<Mutex<Vec<String>>>);

impl Appender for SlowCollect {
    fn append(&mut self, event: &LogEvent) -> rust_queue_logger::Result<()> {
        std::thread::sleep(Duration::from_millis(100));
        self.0.lock().unwrap().push(event.message.clone());
        Ok(())
    }

    fn flush(&mut self) -> rust_queue_logger::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "slow-collect"
    }
}

#[test]
fn test_timed_out_reset_keeps_a_single_worker() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    QueueListener::reset_instance().unwrap();
    let registry = LoggerRegistry::new();
    let logger = global_logger(&registry, "reset.slow");

    let slow = SlowCollect::default();
    let appender = slow.clone();
    let listener = QueueListener::get_or_init(move || {
        QueueListener::builder()
            .appender(appender)
            .poll_interval(Duration::from_millis(10))
            .shutdown_timeout(Duration::from_millis(50))
    });
    listener.start().unwrap();
    for i in 0..3 {
        logger.info(format!("slow {}", i));
    }

    let err = QueueListener::reset_instance().unwrap_err();
    assert!(matches!(err, LoggerError::ShutdownTimeout { .. }));

    // The old listener is still the singleton; nothing new gets built
    let current = QueueListener::get_or_init(|| panic!("a second listener was built"));
    assert!(Arc::ptr_eq(&listener, &current));
    assert!(Arc::ptr_eq(&QueueListener::instance(), &listener));
    let worker = listener.worker_thread_id();
    current.start().unwrap();
    assert_eq!(current.worker_thread_id(), worker);

    let mut attempts = 0;
    while QueueListener::reset_instance().is_err() {
        attempts += 1;
        assert!(attempts < 50, "listener never stopped");
    }

    assert!(!listener.is_running());
    assert_eq!(
        *slow.0.lock().unwrap(),
        vec!["slow 0".to_string(), "slow 1".to_string(), "slow 2".to_string()]
    );
    assert!(Runtime::global().queue().is_empty());
    assert!(!Arc::ptr_eq(&QueueListener::instance(), &listener));
}

#[test]
fn test_leftover_sentinel_does_not_stop_a_new_worker() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let (listener, output) = reset_with_buffer();
    let registry = LoggerRegistry::new();
    let logger = global_logger(&registry, "stale");

    Runtime::global().queue().push(QueueItem::Stop(0)).unwrap();
    listener.start().unwrap();
    logger.info("still processed");
    listener.stop().unwrap();

    assert_eq!(output.messages(), vec!["still processed"]);
    assert_eq!(listener.metrics().stale_sentinels(), 1);
}
