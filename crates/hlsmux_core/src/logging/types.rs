//! Levels, per-run logger settings and line markers.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Severity of a run log line, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// How a [`RunLogger`](super::RunLogger) filters and decorates lines.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Keep tool output out of the log (it still feeds the tail buffer)
    /// and thin out progress lines.
    pub compact: bool,
    /// In compact mode, progress is written once per this many percent.
    pub progress_step: u32,
    /// Tool output lines kept for failure reports.
    pub error_tail: usize,
    /// Prefix lines with `[HH:MM:SS]`.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// Derive from the `[logging]` table.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            compact: settings.compact,
            error_tail: settings.error_tail as usize,
            ..Self::default()
        }
    }
}

/// Receives every line written by a run logger, already formatted.
pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Decoration applied to structural log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    Command,
    Phase,
    Section,
    Success,
    Warning,
    Error,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        let (open, close) = match self {
            MessagePrefix::Command => ("$ ", ""),
            MessagePrefix::Phase => ("=== ", " ==="),
            MessagePrefix::Section => ("--- ", " ---"),
            MessagePrefix::Success => ("[SUCCESS] ", ""),
            MessagePrefix::Warning => ("[WARNING] ", ""),
            MessagePrefix::Error => ("[ERROR] ", ""),
        };
        format!("{open}{message}{close}")
    }
}
