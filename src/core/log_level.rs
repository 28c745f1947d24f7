//! Log level definitions
//!
//! Levels are plain ordered integers so applications can log at
//! non-standard severities; those render as `Level N`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(u32);

impl LogLevel {
    /// Accept everything; on a logger it means "inherit from the parent"
    pub const NOTSET: LogLevel = LogLevel(0);
    pub const TRACE: LogLevel = LogLevel(5);
    pub const DEBUG: LogLevel = LogLevel(10);
    pub const INFO: LogLevel = LogLevel(20);
    pub const WARNING: LogLevel = LogLevel(30);
    pub const ERROR: LogLevel = LogLevel(40);
    pub const CRITICAL: LogLevel = LogLevel(50);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        LogLevel(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Standard name for known levels, `Level N` otherwise
    pub fn name(self) -> Cow<'static, str> {
        match self.standard_name() {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("Level {}", self.0)),
        }
    }

    fn standard_name(self) -> Option<&'static str> {
        match self {
            LogLevel::NOTSET => Some("NOTSET"),
            LogLevel::TRACE => Some("TRACE"),
            LogLevel::DEBUG => Some("DEBUG"),
            LogLevel::INFO => Some("INFO"),
            LogLevel::WARNING => Some("WARNING"),
            LogLevel::ERROR => Some("ERROR"),
            LogLevel::CRITICAL => Some("CRITICAL"),
            _ => None,
        }
    }

    #[cfg(feature = "console")]
    pub fn color_code(self) -> colored::Color {
        use colored::Color::*;
        match self.0 {
            0..=9 => BrightBlack,
            10..=19 => Blue,
            20..=29 => Green,
            30..=39 => Yellow,
            40..=49 => Red,
            _ => BrightRed,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::NOTSET
    }
}

impl From<u32> for LogLevel {
    fn from(value: u32) -> Self {
        LogLevel(value)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<u32>() {
            return Ok(LogLevel(value));
        }

        match trimmed.to_uppercase().as_str() {
            "NOTSET" => Ok(LogLevel::NOTSET),
            "TRACE" => Ok(LogLevel::TRACE),
            "DEBUG" => Ok(LogLevel::DEBUG),
            "INFO" => Ok(LogLevel::INFO),
            "WARN" | "WARNING" => Ok(LogLevel::WARNING),
            "ERROR" => Ok(LogLevel::ERROR),
            "CRITICAL" | "FATAL" => Ok(LogLevel::CRITICAL),
            upper => match upper.strip_prefix("LEVEL ") {
                Some(num) => num
                    .trim()
                    .parse::<u32>()
                    .map(LogLevel)
                    .map_err(|_| format!("Invalid log level: '{}'", s)),
                None => Err(format!("Invalid log level: '{}'", s)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_names() {
        assert_eq!(LogLevel::INFO.name(), "INFO");
        assert_eq!(LogLevel::WARNING.to_string(), "WARNING");
        assert_eq!(LogLevel::CRITICAL.name(), "CRITICAL");
    }

    #[test]
    fn test_non_standard_levels_are_labelled() {
        assert_eq!(LogLevel::new(1).name(), "Level 1");
        assert_eq!(LogLevel::new(99).to_string(), "Level 99");
    }

    #[test]
    fn test_parse_aliases_and_numbers() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::WARNING));
        assert_eq!("Fatal".parse::<LogLevel>(), Ok(LogLevel::CRITICAL));
        assert_eq!("15".parse::<LogLevel>(), Ok(LogLevel::new(15)));
        assert_eq!("Level 7".parse::<LogLevel>(), Ok(LogLevel::new(7)));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(LogLevel::DEBUG < LogLevel::INFO);
        assert!(LogLevel::new(45) > LogLevel::ERROR);
        assert!(LogLevel::NOTSET < LogLevel::new(1));
    }
}
