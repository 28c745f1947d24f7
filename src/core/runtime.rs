//! Process-wide runtime context
//!
//! Owns everything that exists once per process: the shared event queue,
//! the encoder registry, the logger registry and the listener slot. The
//! context is created lazily on first use and lives until process exit.

use super::encoder::EncoderRegistry;
use super::error::Result;
use super::listener::QueueListener;
use super::logger::LoggerRegistry;
use super::queue::{ChannelQueue, EventQueue};
use parking_lot::Mutex;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

static RUNTIME: LazyLock<Runtime> = LazyLock::new(Runtime::new);

pub struct Runtime {
    started: Instant,
    queue: Arc<ChannelQueue>,
    encoders: Arc<EncoderRegistry>,
    loggers: LoggerRegistry,
    listener: Mutex<Option<Arc<QueueListener>>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            queue: Arc::new(ChannelQueue::unbounded()),
            encoders: Arc::new(EncoderRegistry::new()),
            loggers: LoggerRegistry::new(),
            listener: Mutex::new(None),
        }
    }

    pub fn global() -> &'static Runtime {
        &RUNTIME
    }

    /// Time since the runtime was first touched
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// The process-wide event queue
    pub fn queue(&self) -> Arc<dyn EventQueue> {
        self.queue.clone()
    }

    pub fn encoders(&self) -> Arc<EncoderRegistry> {
        Arc::clone(&self.encoders)
    }

    pub fn loggers(&self) -> &LoggerRegistry {
        &self.loggers
    }

    /// The singleton listener, created with `init` if the slot is empty.
    ///
    /// The slot stays locked while `init` runs, so concurrent callers
    /// observe exactly one instance.
    pub fn listener<F>(&self, init: F) -> Arc<QueueListener>
    where
        F: FnOnce() -> QueueListener,
    {
        let mut slot = self.listener.lock();
        Arc::clone(slot.get_or_insert_with(|| Arc::new(init())))
    }

    /// The singleton listener if one has been created
    pub fn current_listener(&self) -> Option<Arc<QueueListener>> {
        self.listener.lock().clone()
    }

    /// Stop and forget the singleton listener.
    ///
    /// The instance stays in the slot until it has stopped, so a stop that
    /// times out leaves it as the singleton and no second worker can be
    /// started on the shared queue. Not safe to race with logging calls
    /// that expect the old instance; meant for reconfiguration in tests and
    /// controlled setups.
    pub fn reset_listener(&self) -> Result<()> {
        let Some(listener) = self.current_listener() else {
            return Ok(());
        };
        listener.stop()?;

        let mut slot = self.listener.lock();
        if slot
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &listener))
        {
            *slot = None;
        }
        Ok(())
    }
}
