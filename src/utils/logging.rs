use crate::core::interfaces::{LogLevel, LogSink};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Logger;

impl Logger {
    /// Install the global tracing subscriber. `RUST_LOG` wins over `debug`.
    pub fn init(debug: bool) {
        let default_filter = if debug { "mince=debug" } else { "mince=info" };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}

/// Name used for a file in log output: the full path when debugging,
/// otherwise just the file name.
pub fn display_name(path: &Path, debug: bool) -> String {
    if debug {
        path.display().to_string()
    } else {
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Forwards pipeline messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        match (level, cause) {
            (LogLevel::Debug, _) => debug!("{}", message),
            (LogLevel::Info, _) => info!("{}", message),
            (LogLevel::Warn, Some(cause)) => warn!(cause = %cause, "⚠️  {}", message),
            (LogLevel::Warn, None) => warn!("⚠️  {}", message),
            (LogLevel::Error, Some(cause)) => error!(cause = %cause, "❌ {}", message),
            (LogLevel::Error, None) => error!("❌ {}", message),
        }
    }
}

/// A message captured by [`RecordingLogSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub cause: Option<String>,
}

/// Keeps every message in memory; handy for embedding and for tests.
#[derive(Debug, Default)]
pub struct RecordingLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.level == level && record.message.contains(needle))
    }
}

impl LogSink for RecordingLogSink {
    fn log(&self, level: LogLevel, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                message: message.to_string(),
                cause: cause.map(|c| c.to_string()),
            });
        }
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
