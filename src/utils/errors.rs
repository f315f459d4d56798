use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::models::PipelineState;

#[derive(Error, Debug)]
pub enum MinceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Compression error in {engine} engine for {file}: {message}")]
    Compression {
        engine: String,
        file: String,
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl MinceError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Attach the offending path to an IO failure
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn compression(engine: &str, file: &str, message: impl Into<String>) -> Self {
        Self::Compression {
            engine: engine.to_string(),
            file: file.to_string(),
            message: message.into(),
            cause: None,
        }
    }

    /// Compression failure that keeps the error which caused it
    pub fn compression_caused_by(
        engine: &str,
        file: &str,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Compression {
            engine: engine.to_string(),
            file: file.to_string(),
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_compression(&self) -> bool {
        matches!(self, Self::Compression { .. })
    }
}

pub type Result<T> = std::result::Result<T, MinceError>;

/// Failure of one output group, tagged with the stage it aborted in.
#[derive(Error, Debug)]
#[error("Output group '{group}' failed while {stage}: {source}")]
pub struct PipelineError {
    pub group: String,
    pub stage: PipelineState,
    #[source]
    pub source: MinceError,
}

impl PipelineError {
    pub fn new(group: &str, stage: PipelineState, source: MinceError) -> Self {
        Self {
            group: group.to_string(),
            stage,
            source,
        }
    }
}

impl From<regex::Error> for MinceError {
    fn from(err: regex::Error) -> Self {
        MinceError::config(format!("Invalid file pattern: {}", err))
    }
}
