//! Strategy log: timestamped messages kept for the host and forwarded to
//! `tracing`.
//!
//! Messages are stamped with the time of the candle being processed, not the
//! wall clock, so a replay produces the same log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub time: Option<DateTime<Utc>>,
    pub level: LogLevel,
    pub strategy: String,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(t) => write!(f, "{} ", t.format("%Y-%m-%d %H:%M:%S"))?,
            None => write!(f, "-- ")?,
        }
        write!(f, "{:<5} [{}] {}", self.level, self.strategy, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyLog {
    strategy: String,
    time: Option<DateTime<Utc>>,
    records: Vec<LogRecord>,
}

impl StrategyLog {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            time: None,
            records: Vec::new(),
        }
    }

    /// Time stamped on subsequent messages.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = Some(time);
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Debug, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        let time = self.time.map(|t| t.to_rfc3339());
        let time = time.as_deref().unwrap_or("-");
        match level {
            LogLevel::Debug => tracing::debug!(strategy = %self.strategy, time, "{message}"),
            LogLevel::Info => tracing::info!(strategy = %self.strategy, time, "{message}"),
            LogLevel::Warn => tracing::warn!(strategy = %self.strategy, time, "{message}"),
            LogLevel::Error => tracing::error!(strategy = %self.strategy, time, "{message}"),
        }
        self.records.push(LogRecord {
            time: self.time,
            level,
            strategy: self.strategy.clone(),
            message,
        });
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.time = None;
    }
}
