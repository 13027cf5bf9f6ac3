//! Logging sinks used by the execution context

use std::sync::Mutex;

/// Severity of a log message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Information,
    Verbose,
    Debug,
}

/// Sink for messages emitted while tasks run
pub trait Log: Send + Sync {
    /// Write a message at the given level
    fn write(&self, level: LogLevel, message: &str);
}

/// Sink that forwards to `tracing`
#[derive(Debug, Default)]
pub struct TracingLog;

impl Log for TracingLog {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Information => tracing::info!("{}", message),
            LogLevel::Verbose => tracing::debug!("{}", message),
            LogLevel::Debug => tracing::trace!("{}", message),
        }
    }
}

/// Sink that keeps every message for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingLog {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl CollectingLog {
    /// Get all collected entries
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Get the collected messages without their levels
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, msg)| msg).collect()
    }

    /// Check whether any message equals `message`
    pub fn contains(&self, message: &str) -> bool {
        self.entries().iter().any(|(_, msg)| msg == message)
    }
}

impl Log for CollectingLog {
    fn write(&self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_log() {
        let log = CollectingLog::default();
        log.write(LogLevel::Information, "Executing task: build...");
        log.write(LogLevel::Error, "Error: boom");

        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[1].0, LogLevel::Error);
        assert!(log.contains("Error: boom"));
        assert!(!log.contains("Error"));
    }

    #[test]
    fn test_tracing_log() {
        // Just verify it doesn't panic without a subscriber
        let log = TracingLog;
        log.write(LogLevel::Verbose, "Executing custom setup action...");
        log.write(LogLevel::Error, "Teardown error: boom");
    }
}
