//! Merge JavaScript or CSS sources into one file and shrink it with a
//! pluggable compressor engine.

pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod utils;

pub use crate::core::{
    CompressionReport, Engine, EngineOptions, EngineRegistry, GroupOutcome, LogLevel, LogSink,
    MinifyService, OutputGroup, Pipeline, PipelineState, ResourceKind, SourceFileSet,
};
pub use crate::utils::{MinceError, PipelineError, Result};
