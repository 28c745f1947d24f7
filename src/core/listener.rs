//! Background consumer of the event queue
//!
//! A [`QueueListener`] owns at most one worker thread. The worker pops
//! events in FIFO order and offers each one to every registered appender.
//! Stopping pushes a stop sentinel through the same queue, so everything
//! queued before `stop` is dispatched before the worker exits.

use super::appender::Appender;
use super::diagnostics::{self, Severity};
use super::error::{panic_message, LoggerError, Result};
use super::log_event::LogEvent;
use super::metrics::ListenerMetrics;
use super::queue::{EventQueue, QueueItem};
use super::runtime::Runtime;
use crate::appenders::{StreamAppender, StreamTarget};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Default time `stop` waits for the worker to drain and exit (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a single blocking pop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Receives sink failures instead of the diagnostics channel
pub type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;

type SharedAppenders = Arc<Mutex<Vec<Box<dyn Appender>>>>;

/// Generations are process-wide so a sentinel can never match a worker of
/// another listener sharing the queue.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

struct Worker {
    handle: JoinHandle<()>,
    generation: u64,
    /// A stop sentinel for this generation is already in the queue
    stop_pending: bool,
}

impl Worker {
    fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|payload| LoggerError::WorkerPanicked(panic_message(&*payload)))
    }
}

/// Everything the worker thread needs, moved into it at spawn
struct WorkerContext {
    queue: Arc<dyn EventQueue>,
    appenders: SharedAppenders,
    metrics: Arc<ListenerMetrics>,
    on_error: Option<ErrorCallback>,
    poll_interval: Duration,
    generation: u64,
}

impl WorkerContext {
    fn run(self) {
        loop {
            match self.queue.pop(Some(self.poll_interval)) {
                Ok(Some(QueueItem::Event(event))) => self.dispatch(&event),
                Ok(Some(QueueItem::Stop(generation))) if generation == self.generation => break,
                Ok(Some(QueueItem::Stop(generation))) => {
                    self.metrics.record_stale_sentinel();
                    diagnostics::warn(format!(
                        "Ignoring stop sentinel for worker generation {} (current is {})",
                        generation, self.generation
                    ));
                }
                Ok(None) => continue,
                Err(e) => {
                    diagnostics::error(format!("Listener worker lost its queue: {}", e));
                    break;
                }
            }
        }

        self.flush_all();
    }

    /// Offer one event to every appender whose level it satisfies.
    /// A failing or panicking appender does not affect the others.
    fn dispatch(&self, event: &LogEvent) {
        let mut appenders = self.appenders.lock();
        for appender in appenders.iter_mut() {
            if event.level < appender.min_level() {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| appender.append(event)));
            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(LoggerError::appender(appender.name(), e.to_string())),
                Err(payload) => Some(LoggerError::appender_panicked(
                    appender.name(),
                    panic_message(&*payload),
                )),
            };

            if let Some(err) = failure {
                self.metrics.record_sink_failure();
                self.report(&err);
            }
        }
        self.metrics.record_dispatched();
    }

    fn flush_all(&self) {
        let mut appenders = self.appenders.lock();
        for appender in appenders.iter_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| appender.flush()));
            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(LoggerError::appender(
                    appender.name(),
                    format!("flush failed: {}", e),
                )),
                Err(payload) => Some(LoggerError::appender_panicked(
                    appender.name(),
                    panic_message(&*payload),
                )),
            };
            if let Some(err) = failure {
                self.report(&err);
            }
        }
    }

    fn report(&self, err: &LoggerError) {
        match &self.on_error {
            Some(callback) => callback(err),
            None => {
                let severity = match err {
                    LoggerError::AppenderPanicked { .. } => Severity::Critical,
                    _ => Severity::Error,
                };
                diagnostics::report(
                    severity,
                    format!("{}. Other appenders continue to function.", err),
                );
            }
        }
    }
}

/// Singleton-capable consumer of an [`EventQueue`]
///
/// # Example
///
/// ```
/// use rust_queue_logger::{ChannelQueue, QueueListener};
/// use rust_queue_logger::appenders::StreamTarget;
/// use std::sync::Arc;
///
/// let listener = QueueListener::builder()
///     .queue(Arc::new(ChannelQueue::unbounded()))
///     .stream(StreamTarget::Stdout)
///     .build();
///
/// listener.start().unwrap();
/// listener.start().unwrap(); // no-op
/// listener.stop().unwrap();
/// listener.stop().unwrap(); // no-op
/// ```
pub struct QueueListener {
    queue: Arc<dyn EventQueue>,
    appenders: SharedAppenders,
    worker: Mutex<Option<Worker>>,
    poll_interval: Duration,
    shutdown_timeout: Duration,
    on_error: Option<ErrorCallback>,
    metrics: Arc<ListenerMetrics>,
}

impl QueueListener {
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::new()
    }

    /// The process-wide listener, created with defaults on first access
    pub fn instance() -> Arc<QueueListener> {
        Runtime::global().listener(|| ListenerBuilder::new().build())
    }

    /// The process-wide listener; `init` configures it if none exists yet
    /// and is ignored otherwise.
    pub fn get_or_init<F>(init: F) -> Arc<QueueListener>
    where
        F: FnOnce() -> ListenerBuilder,
    {
        Runtime::global().listener(|| init().build())
    }

    /// Stop the process-wide listener and clear it so the next access
    /// builds a fresh one. If the stop fails the instance stays in place.
    pub fn reset_instance() -> Result<()> {
        Runtime::global().reset_listener()
    }

    /// Spawn the worker unless one is already running.
    ///
    /// A worker left behind by a timed-out `stop` counts as running until
    /// it reaches its sentinel; after that `start` spawns a fresh one.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.worker.lock();
        if let Some(worker) = slot.as_ref() {
            if !worker.handle.is_finished() {
                return Ok(());
            }
        }
        if let Some(finished) = slot.take() {
            if let Err(e) = finished.join() {
                diagnostics::error(format!("Previous listener worker failed: {}", e));
            }
        }

        *slot = Some(self.spawn_worker()?);
        Ok(())
    }

    fn spawn_worker(&self) -> Result<Worker> {
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        let context = WorkerContext {
            queue: Arc::clone(&self.queue),
            appenders: Arc::clone(&self.appenders),
            metrics: Arc::clone(&self.metrics),
            on_error: self.on_error.clone(),
            poll_interval: self.poll_interval,
            generation,
        };
        let handle = thread::Builder::new()
            .name(format!("queue-listener-{}", generation))
            .spawn(move || context.run())
            .map_err(|e| LoggerError::io_operation("spawning listener worker", e.to_string(), e))?;

        Ok(Worker {
            handle,
            generation,
            stop_pending: false,
        })
    }

    /// Drain the queue up to this point and wait for the worker to exit.
    ///
    /// If the worker does not exit within the shutdown timeout the listener
    /// keeps it and `ShutdownTimeout` is returned; a later `stop` waits for
    /// the same worker and then drains whatever was queued behind its
    /// sentinel.
    pub fn stop(&self) -> Result<()> {
        let mut slot = self.worker.lock();
        let Some(mut worker) = slot.take() else {
            return Ok(());
        };
        let deadline = Instant::now() + self.shutdown_timeout;

        let mut earlier = Ok(());
        if worker.stop_pending || worker.handle.is_finished() {
            // The old worker exits at an earlier sentinel (or already has),
            // so events queued after that point need a fresh worker.
            earlier = match self.wait_for_exit(worker, deadline) {
                Ok(joined) => joined,
                Err(worker) => {
                    *slot = Some(worker);
                    return Err(self.timeout_error());
                }
            };
            if self.queue.is_empty() {
                return earlier;
            }
            if let Err(e) = &earlier {
                diagnostics::error(format!("{}; draining the rest with a new worker", e));
            }
            worker = self.spawn_worker()?;
        }

        if let Err(e) = self.queue.push(QueueItem::Stop(worker.generation)) {
            *slot = Some(worker);
            return Err(e);
        }
        worker.stop_pending = true;

        match self.wait_for_exit(worker, deadline) {
            Ok(joined) => joined.and(earlier),
            Err(worker) => {
                *slot = Some(worker);
                Err(self.timeout_error())
            }
        }
    }

    /// Join the worker once it has exited, or hand it back at the deadline
    fn wait_for_exit(
        &self,
        worker: Worker,
        deadline: Instant,
    ) -> std::result::Result<Result<()>, Worker> {
        loop {
            if worker.handle.is_finished() {
                return Ok(worker.join());
            }
            if Instant::now() >= deadline {
                return Err(worker);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn timeout_error(&self) -> LoggerError {
        LoggerError::ShutdownTimeout {
            timeout: self.shutdown_timeout,
        }
    }

    /// Whether a worker thread is alive
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Thread id of the current worker, if any
    pub fn worker_thread_id(&self) -> Option<ThreadId> {
        self.worker
            .lock()
            .as_ref()
            .map(|worker| worker.handle.thread().id())
    }

    /// Register another appender; takes effect from the next event
    pub fn add_appender<A: Appender + 'static>(&self, appender: A) {
        self.appenders.lock().push(Box::new(appender));
    }

    pub fn appender_names(&self) -> Vec<String> {
        self.appenders
            .lock()
            .iter()
            .map(|appender| appender.name().to_string())
            .collect()
    }

    pub fn appender_count(&self) -> usize {
        self.appenders.lock().len()
    }

    pub fn queue(&self) -> &Arc<dyn EventQueue> {
        &self.queue
    }

    pub fn metrics(&self) -> &ListenerMetrics {
        &self.metrics
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Drop for QueueListener {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            diagnostics::error(format!("Listener shutdown failed on drop: {}", e));
        }
    }
}

/// Builder for [`QueueListener`]
///
/// Without any `appender` the listener gets one JSON stream appender that
/// accepts every level and writes to `stream` (stderr by default).
pub struct ListenerBuilder {
    queue: Option<Arc<dyn EventQueue>>,
    appenders: Vec<Box<dyn Appender>>,
    stream: Option<StreamTarget>,
    poll_interval: Duration,
    shutdown_timeout: Duration,
    on_error: Option<ErrorCallback>,
}

impl ListenerBuilder {
    pub fn new() -> Self {
        Self {
            queue: None,
            appenders: Vec::new(),
            stream: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            on_error: None,
        }
    }

    /// Drain this queue instead of the process-wide one
    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn EventQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    #[must_use]
    pub fn appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.appenders.push(Box::new(appender));
        self
    }

    /// Output of the default appender
    #[must_use]
    pub fn stream(mut self, target: StreamTarget) -> Self {
        self.stream = Some(target);
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Route sink failures to `callback` instead of the diagnostics channel
    ///
    /// # Example
    ///
    /// ```
    /// use rust_queue_logger::QueueListener;
    /// use std::sync::Arc;
    ///
    /// let listener = QueueListener::builder()
    ///     .on_error(Arc::new(|err| eprintln!("sink failure: {}", err)))
    ///     .build();
    /// ```
    #[must_use]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    pub fn build(self) -> QueueListener {
        let mut appenders = self.appenders;
        if appenders.is_empty() {
            let target = self.stream.unwrap_or_default();
            appenders.push(Box::new(StreamAppender::new(target)));
        }

        QueueListener {
            queue: self.queue.unwrap_or_else(|| Runtime::global().queue()),
            appenders: Arc::new(Mutex::new(appenders)),
            worker: Mutex::new(None),
            poll_interval: self.poll_interval,
            shutdown_timeout: self.shutdown_timeout,
            on_error: self.on_error,
            metrics: Arc::new(ListenerMetrics::new()),
        }
    }
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
