//! User-facing status output
//!
//! The collector, persistence layer and comment engine report status through
//! an injected [`Logger`] instead of printing directly. The binary uses
//! [`TracingLogger`]; tests use [`MemoryLogger`], a bounded sink that can be
//! inspected and reset between runs.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Default number of entries a [`MemoryLogger`] keeps before dropping the oldest
const DEFAULT_MEMORY_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Plain output meant for stdout (summaries, tables)
    Log,
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for user-facing messages
pub trait Logger: Send + Sync {
    fn emit(&self, level: LogLevel, message: &str);

    fn log(&self, message: &str) {
        self.emit(LogLevel::Log, message);
    }

    fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }
}

/// Forwards to `tracing`; plain `log` output goes to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Log => println!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// In-memory sink with a fixed capacity
#[derive(Debug)]
pub struct MemoryLogger {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryLogger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Messages logged at exactly `level`
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// All messages joined by newlines, handy for `contains` assertions
    pub fn output(&self) -> String {
        self.lock()
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        // A poisoned buffer still holds valid entries
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Logger for MemoryLogger {
    fn emit(&self, level: LogLevel, message: &str) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_records_levels() {
        let logger = MemoryLogger::default();
        logger.info("collecting");
        logger.warn("md failed");
        logger.log("summary");

        assert_eq!(logger.messages(LogLevel::Warn), vec!["md failed".to_string()]);
        assert_eq!(logger.entries().len(), 3);
        assert!(logger.output().contains("summary"));
    }

    #[test]
    fn test_memory_logger_is_bounded() {
        let logger = MemoryLogger::new(2);
        logger.info("a");
        logger.info("b");
        logger.info("c");

        let messages = logger.messages(LogLevel::Info);
        assert_eq!(messages, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_memory_logger_reset() {
        let logger = MemoryLogger::default();
        logger.error("boom");
        logger.reset();
        assert!(logger.entries().is_empty());
    }
}
