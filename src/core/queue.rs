//! Event queue between producers and the listener worker
//!
//! The listener only depends on the [`EventQueue`] trait. The shipped
//! implementation is an in-process crossbeam channel; a cross-process
//! transport would carry the serde form of [`QueueItem`] instead.

use super::error::{LoggerError, Result};
use super::log_event::LogEvent;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What travels through the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueItem {
    Event(LogEvent),
    /// Stop sentinel addressed to one worker generation
    Stop(u64),
}

/// FIFO channel of log events.
///
/// `push` must never block on the consumer. `pop` is used only by the
/// listener worker and returns `Ok(None)` when the timeout elapses.
pub trait EventQueue: Send + Sync {
    fn push(&self, item: QueueItem) -> Result<()>;
    fn pop(&self, timeout: Option<Duration>) -> Result<Option<QueueItem>>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process multi-producer queue backed by a crossbeam channel
pub struct ChannelQueue {
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
    capacity: Option<usize>,
}

impl ChannelQueue {
    /// Unbounded queue; pushes always succeed
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            capacity: None,
        }
    }

    /// Bounded queue; a push onto a full queue fails with `QueueFull`
    /// instead of waiting
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl EventQueue for ChannelQueue {
    fn push(&self, item: QueueItem) -> Result<()> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(LoggerError::queue_full(
                self.sender.len(),
                self.capacity.unwrap_or_default(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::QueueClosed),
        }
    }

    fn pop(&self, timeout: Option<Duration>) -> Result<Option<QueueItem>> {
        match timeout {
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(item) => Ok(Some(item)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(LoggerError::QueueClosed),
            },
            None => self
                .receiver
                .recv()
                .map(Some)
                .map_err(|_| LoggerError::QueueClosed),
        }
    }

    fn len(&self) -> usize {
        self.receiver.len()
    }
}
