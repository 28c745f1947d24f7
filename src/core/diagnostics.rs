//! Fallback channel for the logger's own warnings and errors
//!
//! Failures inside the consumer or formatter must never reach application
//! code, and they cannot be logged through the pipeline that produced them.
//! They are written to stderr with a `[LOGGER ...]` prefix unless a hook is
//! installed.

use parking_lot::{const_rwlock, RwLock};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

impl Severity {
    fn prefix(self) -> &'static str {
        match self {
            Severity::Warning => "[LOGGER WARNING]",
            Severity::Error => "[LOGGER ERROR]",
            Severity::Critical => "[LOGGER CRITICAL]",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.prefix(), self.message)
    }
}

pub type DiagnosticHook = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

static HOOK: RwLock<Option<DiagnosticHook>> = const_rwlock(None);

/// Route diagnostics to `hook` instead of stderr; returns the previous hook
pub fn set_hook(hook: DiagnosticHook) -> Option<DiagnosticHook> {
    HOOK.write().replace(hook)
}

/// Restore the default stderr output
pub fn clear_hook() -> Option<DiagnosticHook> {
    HOOK.write().take()
}

pub fn report(severity: Severity, message: impl Into<String>) {
    let diagnostic = Diagnostic {
        severity,
        message: message.into(),
    };

    // Clone out so the hook runs without the lock held
    let hook = HOOK.read().clone();
    match hook {
        Some(hook) => hook(&diagnostic),
        None => eprintln!("{}", diagnostic),
    }
}

pub fn warn(message: impl Into<String>) {
    report(Severity::Warning, message);
}

pub fn error(message: impl Into<String>) {
    report(Severity::Error, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_prefix() {
        let d = Diagnostic {
            severity: Severity::Warning,
            message: "queue is slow".into(),
        };
        assert_eq!(d.to_string(), "[LOGGER WARNING] queue is slow");

        let d = Diagnostic {
            severity: Severity::Critical,
            message: "appender panicked".into(),
        };
        assert_eq!(d.to_string(), "[LOGGER CRITICAL] appender panicked");
    }
}
