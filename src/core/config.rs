//! Declarative logging configuration
//!
//! A [`LoggingConfig`] describes named handlers and the loggers they attach
//! to. It is validated completely before anything in the logger registry is
//! touched, so a malformed document leaves the previous setup intact.
//!
//! ```json
//! {
//!   "version": 1,
//!   "handlers": {
//!     "queue": { "class": "queue", "level": "DEBUG" }
//!   },
//!   "loggers": {
//!     "app.db": { "level": "INFO", "handlers": ["queue"], "propagate": false }
//!   },
//!   "root": { "level": "WARNING", "handlers": ["queue"] }
//! }
//! ```

use super::error::{LoggerError, Result};
use super::handler::{AppenderHandler, Handler, NullHandler, QueueHandler};
use super::log_level::LogLevel;
use super::logger::{Logger, LoggerRegistry};
use crate::appenders::{StreamAppender, StreamTarget};
use crate::formatters::{JsonFormatter, TextFormatter};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SUPPORTED_VERSION: u32 = 1;
const MAX_PROVIDER_DEPTH: usize = 32;

/// Level given either by name (`"INFO"`) or number (`20`)
fn deserialize_level<'de, D>(deserializer: D) -> std::result::Result<Option<LogLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LevelRepr {
        Number(u32),
        Name(String),
    }

    match Option::<LevelRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LevelRepr::Number(n)) => Ok(Some(LogLevel::new(n))),
        Some(LevelRepr::Name(name)) => name.parse().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// Feed the event queue
    Queue,
    /// Write synchronously to a standard stream
    Stream,
    Null,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    #[default]
    Stderr,
    Stdout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(alias = "class")]
    pub kind: HandlerKind,
    #[serde(default, deserialize_with = "deserialize_level")]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub stream: StreamKind,
    #[serde(default)]
    pub formatter: FormatterKind,
}

impl HandlerConfig {
    fn build(&self) -> Arc<dyn Handler> {
        let level = self.level.unwrap_or(LogLevel::NOTSET);
        match self.kind {
            HandlerKind::Queue => Arc::new(QueueHandler::new().with_level(level)),
            HandlerKind::Stream => {
                let target = match self.stream {
                    StreamKind::Stderr => StreamTarget::Stderr,
                    StreamKind::Stdout => StreamTarget::Stdout,
                };
                let appender = StreamAppender::new(target).with_min_level(level);
                let appender = match self.formatter {
                    FormatterKind::Json => appender.with_formatter(JsonFormatter::new()),
                    FormatterKind::Text => appender.with_formatter(TextFormatter::new()),
                };
                Arc::new(AppenderHandler::new(appender))
            }
            HandlerKind::Null => Arc::new(NullHandler),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default, deserialize_with = "deserialize_level")]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub handlers: Vec<String>,
    #[serde(default = "default_true")]
    pub propagate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub version: u32,
    #[serde(default = "default_true")]
    pub disable_existing_loggers: bool,
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,
    #[serde(default)]
    pub root: Option<LoggerConfig>,
}

impl LoggingConfig {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| LoggerError::config("logging config", e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| LoggerError::config("logging config", e.to_string()))
    }

    /// Read a JSON config file; a missing or unreadable file is
    /// `ConfigUnreachable`, malformed content is `InvalidConfiguration`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoggerError::config_unreachable(path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            LoggerError::config(format!("logging config {}", path.display()), e.to_string())
        })
    }

    fn validate(&self) -> Result<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(LoggerError::config(
                "logging config",
                format!(
                    "unsupported version {} (expected {})",
                    self.version, SUPPORTED_VERSION
                ),
            ));
        }

        let targets = self
            .loggers
            .iter()
            .map(|(name, logger)| (name.as_str(), logger))
            .chain(self.root.iter().map(|root| ("root", root)));
        for (logger_name, logger) in targets {
            for handler in &logger.handlers {
                if !self.handlers.contains_key(handler) {
                    return Err(LoggerError::config(
                        format!("logger '{}'", logger_name),
                        format!("unknown handler '{}'", handler),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Validate, then reconfigure `registry` to match this document
    pub fn apply(&self, registry: &LoggerRegistry) -> Result<()> {
        self.validate()?;

        let handlers: HashMap<&str, Arc<dyn Handler>> = self
            .handlers
            .iter()
            .map(|(name, handler)| (name.as_str(), handler.build()))
            .collect();

        if self.disable_existing_loggers {
            for logger in registry.loggers() {
                if !self.is_configured(logger.name()) {
                    logger.set_disabled(true);
                }
            }
        }

        for (name, logger_config) in &self.loggers {
            let logger = registry.get(name);
            configure(&logger, logger_config, &handlers);
            logger.set_propagate(logger_config.propagate);
        }

        if let Some(root_config) = &self.root {
            configure(&registry.root(), root_config, &handlers);
        }
        Ok(())
    }

    /// Named in the document, or a descendant of a named logger
    fn is_configured(&self, name: &str) -> bool {
        self.loggers.keys().any(|configured| {
            name == configured
                || name
                    .strip_prefix(configured.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

fn configure(logger: &Logger, config: &LoggerConfig, handlers: &HashMap<&str, Arc<dyn Handler>>) {
    logger.set_disabled(false);
    if let Some(level) = config.level {
        logger.set_level(level);
    }
    logger.clear_handlers();
    for name in &config.handlers {
        if let Some(handler) = handlers.get(name.as_str()) {
            logger.add_handler(Arc::clone(handler));
        }
    }
}

/// Provider of a configuration source, called at resolve time
pub type ConfigProvider = Arc<dyn Fn() -> ConfigSource + Send + Sync>;

/// Where an entry point gets its logging configuration from
#[derive(Clone)]
pub enum ConfigSource {
    Static(LoggingConfig),
    File(PathBuf),
    /// Resolved recursively until a static or file form is reached
    Provider(ConfigProvider),
}

impl ConfigSource {
    pub fn provider<F>(provider: F) -> Self
    where
        F: Fn() -> ConfigSource + Send + Sync + 'static,
    {
        ConfigSource::Provider(Arc::new(provider))
    }

    /// Produce the concrete configuration, following providers
    pub fn resolve(&self) -> Result<LoggingConfig> {
        let mut current = self.clone();
        for _ in 0..MAX_PROVIDER_DEPTH {
            match current {
                ConfigSource::Static(config) => return Ok(config),
                ConfigSource::File(path) => return LoggingConfig::from_file(path),
                ConfigSource::Provider(provider) => current = provider(),
            }
        }
        Err(LoggerError::config(
            "config source",
            format!("providers nested deeper than {} levels", MAX_PROVIDER_DEPTH),
        ))
    }
}

impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Static(config) => f.debug_tuple("Static").field(config).finish(),
            ConfigSource::File(path) => f.debug_tuple("File").field(path).finish(),
            ConfigSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl From<LoggingConfig> for ConfigSource {
    fn from(config: LoggingConfig) -> Self {
        ConfigSource::Static(config)
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::File(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::File(path.to_path_buf())
    }
}

impl From<&str> for ConfigSource {
    fn from(path: &str) -> Self {
        ConfigSource::File(PathBuf::from(path))
    }
}
