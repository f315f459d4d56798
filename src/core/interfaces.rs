use crate::core::models::{EngineOptions, ResourceKind};
use crate::utils::Result;
use std::io::{Read, Write};

/// Severity accepted by a [`LogSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Destination for pipeline messages.
///
/// The pipeline never logs through a global; callers hand it a sink.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, cause: Option<&(dyn std::error::Error + 'static)>);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        self.log(LogLevel::Error, message, cause);
    }
}

/// Per-invocation information handed to an engine
pub struct EngineContext<'a> {
    /// Name of the artifact being compressed, used in diagnostics
    pub file_name: &'a str,
    pub log: &'a dyn LogSink,
}

/// A pluggable compressor backend.
///
/// `compress` must read `input` to the end and write the complete result to
/// `output` before returning. Both streams belong to the caller and are
/// released by it.
pub trait Engine: Send + Sync {
    /// Registry name, matched case-insensitively
    fn name(&self) -> &str;

    /// Additional names the engine answers to
    fn aliases(&self) -> &[&str] {
        &[]
    }

    fn kind(&self) -> ResourceKind;

    fn compress(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        options: &EngineOptions,
        context: &EngineContext<'_>,
    ) -> Result<()>;
}
