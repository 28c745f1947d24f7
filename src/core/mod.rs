//! Core pipeline types: events, queue, listener, loggers and configuration

pub mod appender;
pub mod config;
pub mod diagnostics;
pub mod encoder;
pub mod entrypoint;
pub mod error;
pub mod field_value;
pub mod handler;
pub mod listener;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod queue;
pub mod runtime;

pub use appender::Appender;
pub use config::{
    ConfigProvider, ConfigSource, FormatterKind, HandlerConfig, HandlerKind, LoggerConfig,
    LoggingConfig, StreamKind,
};
pub use encoder::{register_encoder, Encoder, EncoderRegistry};
pub use entrypoint::{entrypoint, Entrypoint};
pub use error::{LoggerError, Result};
pub use field_value::{FieldValue, OpaqueValue};
pub use handler::{AppenderHandler, Handler, NullHandler, QueueHandler};
pub use listener::{
    ErrorCallback, ListenerBuilder, QueueListener, DEFAULT_POLL_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use log_event::{Location, LogEvent, Record, RESERVED_ATTRS};
pub use log_level::LogLevel;
pub use logger::{get_logger, EventBuilder, Logger, LoggerRegistry};
pub use metrics::ListenerMetrics;
pub use queue::{ChannelQueue, EventQueue, QueueItem};
pub use runtime::Runtime;
