//! Plugin log surface
//!
//! Bounded history of messages plugins emitted or failures they caused,
//! kept for display by the host. Every entry is also forwarded to `tracing`
//! under the `gridwell::plugin` target.

use std::collections::VecDeque;
use std::fmt;

/// Default number of entries kept.
pub const DEFAULT_LOG_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level from the `Log` opcode. Out-of-range values clamp.
    pub fn from_i64(v: i64) -> Self {
        match v {
            i64::MIN..=0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub plugin: String,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug)]
pub struct PluginLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for PluginLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl PluginLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, plugin: &str, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(target: "gridwell::plugin", plugin, "{message}"),
            LogLevel::Info => tracing::info!(target: "gridwell::plugin", plugin, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "gridwell::plugin", plugin, "{message}"),
            LogLevel::Error => tracing::error!(target: "gridwell::plugin", plugin, "{message}"),
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            plugin: plugin.to_owned(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
