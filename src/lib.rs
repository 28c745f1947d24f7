//! # Rust Queue Logger
//!
//! Structured logging that keeps formatting and I/O off application threads.
//!
//! ## Pipeline
//!
//! - **Producers**: loggers hand each call to a [`QueueHandler`], which
//!   renders the message and error trace into a [`LogEvent`] snapshot and
//!   pushes it onto the process-wide [`EventQueue`] without blocking.
//! - **Listener**: one [`QueueListener`] per process drains the queue on a
//!   background thread and dispatches every event to its appenders in order.
//! - **Rendering**: [`JsonFormatter`](formatters::JsonFormatter) writes one
//!   JSON object per line; values it cannot render natively go through the
//!   [`EncoderRegistry`].
//! - **Lifecycle**: [`Entrypoint`] applies a [`LoggingConfig`], starts the
//!   listener, runs application code and always stops the listener.
//!
//! ## Example
//!
//! ```
//! use rust_queue_logger::prelude::*;
//!
//! let logger = get_logger("app");
//! logger.set_level(LogLevel::INFO);
//! logger.add_handler(std::sync::Arc::new(QueueHandler::new()));
//!
//! let listener = QueueListener::instance();
//! listener.start().unwrap();
//! logger.event(LogLevel::INFO).field("port", 8080).message("listening");
//! listener.stop().unwrap();
//! ```

pub mod appenders;
pub mod core;
pub mod formatters;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{StreamAppender, StreamTarget};
    pub use crate::core::{
        entrypoint, get_logger, register_encoder, Appender, ChannelQueue, ConfigSource,
        Entrypoint, EventQueue, FieldValue, Handler, ListenerBuilder, ListenerMetrics, LogEvent,
        LogLevel, Logger, LoggerError, LoggingConfig, QueueHandler, QueueListener, Result,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::formatters::{Formatter, JsonFormatter, TextFormatter};
}

pub use appenders::{StreamAppender, StreamTarget};
pub use core::{
    diagnostics, entrypoint, get_logger, register_encoder, Appender, AppenderHandler,
    ChannelQueue, ConfigSource, EncoderRegistry, Entrypoint, EventBuilder, EventQueue, FieldValue,
    Handler, ListenerBuilder, ListenerMetrics, Location, LogEvent, LogLevel, Logger, LoggerError,
    LoggerRegistry, LoggingConfig, NullHandler, OpaqueValue, QueueHandler, QueueItem,
    QueueListener, Record, Result, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use formatters::{Formatter, JsonFormatter, TextFormatter};
