use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Resource family handled by an output group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "js", alias = "javascript")]
    JavaScript,
    #[serde(rename = "css")]
    Css,
}

impl ResourceKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(ResourceKind::JavaScript),
            "css" => Some(ResourceKind::Css),
            _ => None,
        }
    }

    /// Engine used when a group does not name one
    pub fn default_engine(&self) -> &'static str {
        match self {
            ResourceKind::JavaScript => "",
            ResourceKind::Css => "css",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::JavaScript => write!(f, "JavaScript"),
            ResourceKind::Css => write!(f, "CSS"),
        }
    }
}

/// Options handed verbatim to whichever engine is selected.
///
/// Engines ignore the fields they do not understand; see each engine's
/// documentation for the subset it honours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub engine_name: String,
    /// Break output lines after this column; `None` keeps everything on one line
    pub line_break_column: Option<usize>,
    pub munge_variables: bool,
    pub verbose_logging: bool,
    pub preserve_semicolons: bool,
    pub disable_micro_optimizations: bool,
    pub character_encoding: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            engine_name: String::new(),
            line_break_column: None,
            munge_variables: true,
            verbose_logging: false,
            preserve_semicolons: false,
            disable_micro_optimizations: false,
            character_encoding: "UTF-8".to_string(),
        }
    }
}

/// Ordered list of files to concatenate. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFileSet {
    files: Vec<PathBuf>,
}

impl SourceFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }

    /// Append only when the path is not already part of the set
    pub fn push_unique(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.files.contains(&path) {
            return false;
        }
        self.files.push(path);
        true
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for SourceFileSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArtifact {
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifiedArtifact {
    pub path: PathBuf,
    pub engine: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionReport {
    pub original_size: u64,
    pub minified_size: u64,
    pub gzipped_size: u64,
    pub reduction_percentage: f64,
}

impl CompressionReport {
    pub fn from_sizes(original_size: u64, minified_size: u64, gzipped_size: u64) -> Self {
        let reduction_percentage = if original_size == 0 {
            0.0
        } else {
            (original_size as f64 - minified_size as f64) / original_size as f64 * 100.0
        };

        Self {
            original_size,
            minified_size,
            gzipped_size,
            reduction_percentage,
        }
    }

    pub fn saved_bytes(&self) -> u64 {
        self.original_size.saturating_sub(self.minified_size)
    }
}

impl fmt::Display for CompressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}% reduction ({} → {} bytes, {} bytes gzipped)",
            self.reduction_percentage, self.original_size, self.minified_size, self.gzipped_size
        )
    }
}

/// Lifecycle of a single output group run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Merging,
    Minifying,
    Reporting,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Merging => "merging",
            PipelineState::Minifying => "minifying",
            PipelineState::Reporting => "reporting",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One configured merge/minify unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputGroup {
    pub name: String,
    pub kind: ResourceKind,
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub source_includes: Vec<String>,
    #[serde(default)]
    pub source_excludes: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub output_filename: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default)]
    pub nosuffix: bool,
    #[serde(default)]
    pub keep_merged: bool,
    #[serde(default)]
    pub skip_merge: bool,
    #[serde(default)]
    pub skip_minify: bool,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub linebreak: Option<usize>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default = "default_true")]
    pub munge: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub preserve_semicolons: bool,
    #[serde(default)]
    pub disable_optimizations: bool,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_suffix() -> String {
    ".min".to_string()
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_true() -> bool {
    true
}

impl OutputGroup {
    pub fn new(name: &str, kind: ResourceKind, output_filename: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            source_dir: default_source_dir(),
            source_files: Vec::new(),
            source_includes: Vec::new(),
            source_excludes: Vec::new(),
            output_dir: default_output_dir(),
            output_filename: output_filename.to_string(),
            suffix: default_suffix(),
            nosuffix: false,
            keep_merged: false,
            skip_merge: false,
            skip_minify: false,
            charset: default_charset(),
            linebreak: None,
            engine: None,
            munge: true,
            verbose: false,
            preserve_semicolons: false,
            disable_optimizations: false,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            engine_name: self
                .engine
                .clone()
                .unwrap_or_else(|| self.kind.default_engine().to_string()),
            line_break_column: self.linebreak,
            munge_variables: self.munge,
            verbose_logging: self.verbose,
            preserve_semicolons: self.preserve_semicolons,
            disable_micro_optimizations: self.disable_optimizations,
            character_encoding: self.charset.clone(),
        }
    }

    /// Resolve relative directories against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.source_dir.is_relative() {
            self.source_dir = base.join(&self.source_dir);
        }
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
    }
}

/// Result of running one output group to completion
#[derive(Debug, Clone, Default)]
pub struct GroupOutcome {
    pub group: String,
    pub merged: Option<MergedArtifact>,
    pub minified: Vec<MinifiedArtifact>,
    pub reports: Vec<CompressionReport>,
}
