use crate::core::interfaces::{Engine, EngineContext, LogSink};
use crate::core::models::*;
use crate::core::registry::EngineRegistry;
use crate::infrastructure::file_system::{
    collect_sources, merged_file_name, minified_file_name, TEMP_SUFFIX,
};
use crate::infrastructure::processors::common::resolve_encoding;
use crate::utils::{display_name, MinceError, PipelineError, Result};
use flate2::{read::GzEncoder, Compression};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;

/// Create `path`'s parent directory and a temporary file inside it.
///
/// Artifacts are written to the temporary file and renamed into place once
/// complete, so a failed run never leaves a truncated file at `path`.
fn temp_file_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| MinceError::io(dir, e))?;
    NamedTempFile::new_in(dir).map_err(|e| MinceError::io(dir, e))
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MinceError::io(path, e)),
    }
}

/// Concatenate `sources` byte for byte, in order, into `target`.
///
/// No separator is inserted between files. `encoding` is validated here and
/// applied by the engine when the merged text is decoded.
pub fn merge(
    sources: &SourceFileSet,
    encoding: &str,
    target: &Path,
    log: &dyn LogSink,
    debug: bool,
) -> Result<MergedArtifact> {
    let started = Instant::now();

    if sources.is_empty() {
        return Err(MinceError::config(format!(
            "no source files to merge into {}",
            display_name(target, debug)
        )));
    }
    resolve_encoding(encoding)?;
    remove_stale(target)?;

    log.info(&format!(
        "Creating the merged file [{}].",
        display_name(target, debug)
    ));

    let mut temp = temp_file_beside(target)?;
    let mut size = 0;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        for source in sources.files() {
            log.debug(&format!("Appending [{}].", display_name(source, debug)));
            let mut reader = File::open(source).map_err(|e| MinceError::io(source, e))?;
            size += io::copy(&mut reader, &mut writer).map_err(|e| MinceError::io(source, e))?;
        }
        writer.flush().map_err(|e| MinceError::io(target, e))?;
    }
    temp.persist(target).map_err(|e| MinceError::io(target, e.error))?;
    log.debug(&format!(
        "Merged {} file(s) in {:.2?}.",
        sources.len(),
        started.elapsed()
    ));

    Ok(MergedArtifact {
        path: target.to_path_buf(),
        size,
    })
}

/// Run `engine` from `source` into a temporary file and move the result to
/// `target`. Reader, writer and temporary file are released on every path,
/// innermost first.
fn compress_into(
    engine: &dyn Engine,
    source: &Path,
    target: &Path,
    options: &EngineOptions,
    context: &EngineContext<'_>,
) -> Result<()> {
    let mut reader = BufReader::new(File::open(source).map_err(|e| MinceError::io(source, e))?);
    let mut temp = temp_file_beside(target)?;
    let mut writer = BufWriter::new(temp.as_file_mut());

    engine.compress(&mut reader, &mut writer, options, context)?;

    writer.flush().map_err(|e| MinceError::io(target, e))?;
    drop(writer);
    temp.persist(target).map_err(|e| MinceError::io(target, e.error))?;
    Ok(())
}

/// Compress `merged` into `target` with the engine named in `options`.
///
/// The engine must accept `kind`. Failures are logged with the file's
/// identity and then returned.
pub fn minify(
    merged: &MergedArtifact,
    target: &Path,
    kind: ResourceKind,
    options: &EngineOptions,
    registry: &EngineRegistry,
    log: &dyn LogSink,
    debug: bool,
) -> Result<MinifiedArtifact> {
    let started = Instant::now();

    let engine = registry.select(&options.engine_name)?;
    if engine.kind() != kind {
        return Err(MinceError::config(format!(
            "engine '{}' compresses {} files, not {}",
            engine.name(),
            engine.kind(),
            kind
        )));
    }

    log.info(&format!(
        "Creating the minified file [{}].",
        display_name(target, debug)
    ));
    log.debug(&format!("Using the {} engine.", engine.name()));

    let merged_name = display_name(&merged.path, false);
    let context = EngineContext {
        file_name: merged_name.strip_suffix(TEMP_SUFFIX).unwrap_or(&merged_name),
        log,
    };

    if let Err(err) = compress_into(engine.as_ref(), &merged.path, target, options, &context) {
        log.error(
            &format!(
                "Failed to compress the file [{}].",
                display_name(&merged.path, debug)
            ),
            Some(&err),
        );
        return Err(err);
    }
    log.debug(&format!(
        "Compressed [{}] in {:.2?}.",
        display_name(target, debug),
        started.elapsed()
    ));

    Ok(MinifiedArtifact {
        path: target.to_path_buf(),
        engine: engine.name().to_string(),
    })
}

fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| MinceError::io(path, e))
}

fn gzipped_size(path: &Path) -> Result<u64> {
    let file = File::open(path).map_err(|e| MinceError::io(path, e))?;
    let mut encoder = GzEncoder::new(BufReader::new(file), Compression::default());
    io::copy(&mut encoder, &mut io::sink()).map_err(|e| MinceError::io(path, e))
}

/// Measure the size reduction from `original` to `minified` and log it.
pub fn report(
    original: &Path,
    minified: &Path,
    log: &dyn LogSink,
    debug: bool,
) -> Result<CompressionReport> {
    let report = CompressionReport::from_sizes(
        file_size(original)?,
        file_size(minified)?,
        gzipped_size(minified)?,
    );

    log.info(&format!(
        "Compression gains for [{}]: {}",
        display_name(minified, debug),
        report
    ));

    Ok(report)
}

/// Merged file that is removed when dropped unless it must be kept
struct Intermediate {
    path: PathBuf,
    keep: bool,
}

impl Drop for Intermediate {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Runs one output group through Merge → Minify → Report.
///
/// The first error moves the pipeline to [`PipelineState::Failed`] and is
/// returned tagged with the stage it happened in. Nothing is retried.
pub struct Pipeline {
    registry: Arc<EngineRegistry>,
    log: Arc<dyn LogSink>,
    debug: bool,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(registry: Arc<EngineRegistry>, log: Arc<dyn LogSink>) -> Self {
        Self {
            registry,
            log,
            debug: false,
            state: PipelineState::Idle,
        }
    }

    /// Show full paths instead of file names in log output
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn enter(&mut self, group: &OutputGroup, state: PipelineState) {
        self.log
            .debug(&format!("[{}] {} → {}", group.name, self.state, state));
        self.state = state;
    }

    fn fail(&mut self, group: &OutputGroup, err: MinceError) -> PipelineError {
        let stage = self.state;
        self.state = PipelineState::Failed;
        PipelineError::new(&group.name, stage, err)
    }

    pub fn run(&mut self, group: &OutputGroup) -> std::result::Result<GroupOutcome, PipelineError> {
        self.state = PipelineState::Idle;
        let mut outcome = GroupOutcome {
            group: group.name.clone(),
            ..Default::default()
        };

        if group.skip_merge && group.skip_minify {
            self.log.warn(&format!(
                "Both merge and minify are skipped for group '{}'; nothing to do.",
                group.name
            ));
            self.enter(group, PipelineState::Done);
            return Ok(outcome);
        }

        self.enter(group, PipelineState::Merging);
        let sources = match collect_sources(group) {
            Ok(sources) if sources.is_empty() => {
                return Err(self.fail(
                    group,
                    MinceError::config(format!("no source files found for group '{}'", group.name)),
                ))
            }
            Ok(sources) => sources,
            Err(err) => return Err(self.fail(group, err)),
        };

        if group.skip_merge {
            self.log.info("Skipping the merge step...");
            for source in sources.files() {
                if let Err(err) = self.minify_single(group, source, &mut outcome) {
                    return Err(self.fail(group, err));
                }
            }
            self.enter(group, PipelineState::Done);
            return Ok(outcome);
        }

        let target_name =
            minified_file_name(&group.output_filename, &group.suffix, group.nosuffix);
        // an empty suffix names the minified file like the merged one
        let collides = !group.skip_minify && target_name == group.output_filename;
        let merged_path = group
            .output_dir
            .join(merged_file_name(&group.output_filename, collides));
        let merged = match merge(&sources, &group.charset, &merged_path, self.log.as_ref(), self.debug) {
            Ok(merged) => merged,
            Err(err) => return Err(self.fail(group, err)),
        };

        if group.skip_minify {
            self.log.info("Skipping the minify step...");
            outcome.merged = Some(merged);
            self.enter(group, PipelineState::Done);
            return Ok(outcome);
        }

        let keep = group.keep_merged && !collides;
        let intermediate = Intermediate {
            path: merged.path.clone(),
            keep,
        };

        let target = group.output_dir.join(target_name);
        self.minify_and_report(group, &merged, &target, &mut outcome)
            .map_err(|err| self.fail(group, err))?;

        drop(intermediate);
        if keep {
            outcome.merged = Some(merged);
        }
        self.enter(group, PipelineState::Done);
        Ok(outcome)
    }

    fn minify_and_report(
        &mut self,
        group: &OutputGroup,
        merged: &MergedArtifact,
        target: &Path,
        outcome: &mut GroupOutcome,
    ) -> Result<()> {
        self.enter(group, PipelineState::Minifying);
        let minified = minify(
            merged,
            target,
            group.kind,
            &group.engine_options(),
            &self.registry,
            self.log.as_ref(),
            self.debug,
        )?;

        self.enter(group, PipelineState::Reporting);
        let report = report(&merged.path, &minified.path, self.log.as_ref(), self.debug)?;

        outcome.minified.push(minified);
        outcome.reports.push(report);
        Ok(())
    }

    /// Minify one source file on its own, mirroring its sub-directory below
    /// the source directory into the output directory
    fn minify_single(
        &mut self,
        group: &OutputGroup,
        source: &Path,
        outcome: &mut GroupOutcome,
    ) -> Result<()> {
        let relative = source.strip_prefix(&group.source_dir).unwrap_or(source);
        let file_name = relative
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| MinceError::config(format!("invalid source file name {}", source.display())))?;
        let sub_dir = relative.parent().unwrap_or_else(|| Path::new(""));
        let target = group
            .output_dir
            .join(sub_dir)
            .join(minified_file_name(file_name, &group.suffix, group.nosuffix));
        if target == source {
            return Err(MinceError::config(format!(
                "minifying {} would overwrite its own source",
                source.display()
            )));
        }

        let artifact = MergedArtifact {
            path: source.to_path_buf(),
            size: file_size(source)?,
        };
        self.minify_and_report(group, &artifact, &target, outcome)
    }
}

/// Runs many output groups concurrently on the blocking thread pool.
#[derive(Clone)]
pub struct MinifyService {
    registry: Arc<EngineRegistry>,
    log: Arc<dyn LogSink>,
    debug: bool,
}

impl MinifyService {
    pub fn new(registry: Arc<EngineRegistry>, log: Arc<dyn LogSink>) -> Self {
        Self {
            registry,
            log,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Run one group on the current thread
    pub fn run_group(&self, group: &OutputGroup) -> std::result::Result<GroupOutcome, PipelineError> {
        Pipeline::new(self.registry.clone(), self.log.clone())
            .with_debug(self.debug)
            .run(group)
    }

    /// Run every group, each in its own blocking task. Results come back in
    /// the order of `groups`.
    pub async fn run_all(
        &self,
        groups: Vec<OutputGroup>,
    ) -> Vec<std::result::Result<GroupOutcome, PipelineError>> {
        let tasks = groups.into_iter().map(|group| {
            let service = self.clone();
            async move {
                let name = group.name.clone();
                tokio::task::spawn_blocking(move || service.run_group(&group))
                    .await
                    .unwrap_or_else(|e| {
                        Err(PipelineError::new(
                            &name,
                            PipelineState::Failed,
                            MinceError::compression_caused_by(
                                "pipeline",
                                &name,
                                format!("worker task failed: {}", e),
                                e,
                            ),
                        ))
                    })
            }
        });

        futures::future::join_all(tasks).await
    }
}
