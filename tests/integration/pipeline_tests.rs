use mince::core::{
    EngineRegistry, LogLevel, LogSink, MinifyService, OutputGroup, Pipeline, PipelineState,
    ResourceKind,
};
use mince::utils::RecordingLogSink;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn js_group(root: &Path, files: &[&str]) -> OutputGroup {
    let mut group = OutputGroup::new("scripts", ResourceKind::JavaScript, "app.js");
    group.source_dir = root.join("src");
    group.output_dir = root.join("dist");
    group.source_files = files.iter().map(|f| f.to_string()).collect();
    group
}

fn pipeline(log: &Arc<RecordingLogSink>) -> Pipeline {
    let sink: Arc<dyn LogSink> = log.clone();
    Pipeline::new(Arc::new(EngineRegistry::builtin()), sink)
}

fn dist_entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root.join("dist"))
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn test_merge_and_minify_two_scripts() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.txt", "var x = 1;  \n");
    write(root, "src/b.txt", "var y = 2;\n");

    let mut group = js_group(root, &["a.txt", "b.txt"]);
    group.engine = Some("legacy".to_string());
    group.munge = false;
    group.keep_merged = true;

    let log = Arc::new(RecordingLogSink::new());
    let mut pipeline = pipeline(&log);
    let outcome = pipeline.run(&group).unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);

    let merged = fs::read_to_string(root.join("dist/app.js")).unwrap();
    assert_eq!(merged, "var x = 1;  \nvar y = 2;\n");
    assert_eq!(outcome.merged.as_ref().unwrap().size, merged.len() as u64);

    let minified = fs::read_to_string(root.join("dist/app.min.js")).unwrap();
    assert!(!minified.is_empty());
    assert!(minified.len() < merged.len());
    assert!(minified.contains('x'));
    assert!(minified.contains('y'));

    assert_eq!(outcome.reports.len(), 1);
    let report = outcome.reports[0];
    assert_eq!(report.original_size, merged.len() as u64);
    assert!(report.minified_size < report.original_size);
    assert!(report.reduction_percentage > 0.0);

    assert!(log.contains(LogLevel::Info, "Creating the merged file [app.js]"));
    assert!(log.contains(LogLevel::Info, "Creating the minified file [app.min.js]"));
    assert!(log.contains(LogLevel::Info, "Compression gains"));
}

#[test]
fn test_missing_source_aborts_while_merging() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;");

    let group = js_group(root, &["a.js", "missing.js"]);
    let log = Arc::new(RecordingLogSink::new());
    let mut pipeline = pipeline(&log);

    let err = pipeline.run(&group).unwrap_err();

    assert_eq!(err.stage, PipelineState::Merging);
    assert!(err.source.is_io());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!root.join("dist/app.js").exists());
    assert!(!root.join("dist/app.min.js").exists());
    assert!(dist_entries(root).is_empty());
}

#[test]
fn test_unknown_engine_aborts_while_minifying() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;");

    let mut group = js_group(root, &["a.js"]);
    group.engine = Some("unknown".to_string());

    let log = Arc::new(RecordingLogSink::new());
    let mut pipeline = pipeline(&log);
    let err = pipeline.run(&group).unwrap_err();

    assert_eq!(err.stage, PipelineState::Minifying);
    assert!(err.source.is_config());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(dist_entries(root).is_empty());
}

#[test]
fn test_syntax_error_is_logged_with_file_name() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var = ;");

    let group = js_group(root, &["a.js"]);
    let log = Arc::new(RecordingLogSink::new());
    let err = pipeline(&log).run(&group).unwrap_err();

    assert_eq!(err.stage, PipelineState::Minifying);
    assert!(err.source.is_compression());

    let failure = log
        .records()
        .into_iter()
        .find(|r| r.level == LogLevel::Error)
        .unwrap();
    assert_eq!(failure.message, "Failed to compress the file [app.js].");
    assert!(failure.cause.is_some());
    assert!(dist_entries(root).is_empty());
}

#[test]
fn test_debug_logging_shows_full_paths() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;");

    let group = js_group(root, &["a.js"]);
    let log = Arc::new(RecordingLogSink::new());
    pipeline(&log).with_debug(true).run(&group).unwrap();

    let full = root.join("dist/app.min.js");
    assert!(log.contains(LogLevel::Info, &full.display().to_string()));
}

#[test]
fn test_nosuffix_replaces_merged_file() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "function add(first, second) {\n  return first + second;\n}\n");

    let mut group = js_group(root, &["a.js"]);
    group.nosuffix = true;
    group.keep_merged = true;

    let log = Arc::new(RecordingLogSink::new());
    let outcome = pipeline(&log).run(&group).unwrap();

    assert_eq!(dist_entries(root), vec!["app.js".to_string()]);
    assert!(outcome.merged.is_none());
    let minified = fs::read_to_string(root.join("dist/app.js")).unwrap();
    assert!(minified.contains("add"));
    assert!(!minified.contains("second"));
}

#[test]
fn test_empty_suffix_keeps_minified_output() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;   // one\n");

    let mut group = js_group(root, &["a.js"]);
    group.suffix = String::new();
    group.keep_merged = true;

    let log = Arc::new(RecordingLogSink::new());
    let outcome = pipeline(&log).run(&group).unwrap();

    assert_eq!(dist_entries(root), vec!["app.js".to_string()]);
    assert!(outcome.merged.is_none());

    let report = outcome.reports[0];
    assert_eq!(report.original_size, 20);
    assert!(report.minified_size < report.original_size);
    let minified = fs::read_to_string(root.join("dist/app.js")).unwrap();
    assert!(!minified.contains("one"));
}

#[test]
fn test_skip_merge_refuses_to_overwrite_sources() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;\n");

    let mut group = js_group(root, &["a.js"]);
    group.output_dir = root.join("src");
    group.suffix = String::new();
    group.skip_merge = true;

    let log = Arc::new(RecordingLogSink::new());
    let err = pipeline(&log).run(&group).unwrap_err();

    assert!(err.source.is_config());
    assert_eq!(fs::read_to_string(root.join("src/a.js")).unwrap(), "var a = 1;\n");
}

#[test]
fn test_stage_timings_go_through_the_sink() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;");

    let group = js_group(root, &["a.js"]);
    let log = Arc::new(RecordingLogSink::new());
    pipeline(&log).run(&group).unwrap();

    assert!(log.contains(LogLevel::Debug, "Merged 1 file(s) in"));
    assert!(log.contains(LogLevel::Debug, "Compressed [app.min.js] in"));
}

#[test]
fn test_merged_file_removed_unless_kept() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;");

    let group = js_group(root, &["a.js"]);
    let log = Arc::new(RecordingLogSink::new());
    pipeline(&log).run(&group).unwrap();

    assert_eq!(dist_entries(root), vec!["app.min.js".to_string()]);
}

#[test]
fn test_skip_minify_only_merges() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;\n");
    write(root, "src/b.js", "var b = 2;\n");

    let mut group = js_group(root, &[]);
    group.source_includes = vec!["*.js".to_string()];
    group.skip_minify = true;
    group.nosuffix = true;

    let log = Arc::new(RecordingLogSink::new());
    let outcome = pipeline(&log).run(&group).unwrap();

    assert_eq!(dist_entries(root), vec!["app.js".to_string()]);
    assert_eq!(
        fs::read_to_string(root.join("dist/app.js")).unwrap(),
        "var a = 1;\nvar b = 2;\n"
    );
    assert!(outcome.merged.is_some());
    assert!(outcome.minified.is_empty());
}

#[test]
fn test_skip_merge_minifies_each_file_in_place() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/main.js", "var main = 'entry';  \n");
    write(root, "src/lib/util.js", "function util( value ) {\n  return value;\n}\n");

    let mut group = js_group(root, &[]);
    group.source_includes = vec!["**/*.js".to_string()];
    group.skip_merge = true;

    let log = Arc::new(RecordingLogSink::new());
    let outcome = pipeline(&log).run(&group).unwrap();

    assert!(root.join("dist/main.min.js").exists());
    assert!(root.join("dist/lib/util.min.js").exists());
    assert!(!root.join("dist/app.js").exists());
    assert_eq!(outcome.minified.len(), 2);
    assert_eq!(outcome.reports.len(), 2);
    assert!(log.contains(LogLevel::Info, "Skipping the merge step"));
}

#[test]
fn test_skip_both_does_nothing() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();

    let mut group = js_group(root, &["a.js"]);
    group.skip_merge = true;
    group.skip_minify = true;

    let log = Arc::new(RecordingLogSink::new());
    let mut pipeline = pipeline(&log);
    let outcome = pipeline.run(&group).unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert!(outcome.reports.is_empty());
    assert!(log.contains(LogLevel::Warn, "nothing to do"));
}

#[test]
fn test_empty_source_set_is_config_error() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("src")).unwrap();

    let mut group = js_group(root, &[]);
    group.source_includes = vec!["**/*.js".to_string()];

    let log = Arc::new(RecordingLogSink::new());
    let err = pipeline(&log).run(&group).unwrap_err();

    assert_eq!(err.stage, PipelineState::Merging);
    assert!(err.source.is_config());
}

#[test]
fn test_css_group_uses_css_engine_by_default() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "css/base.css", "/* base */\nbody {\n  margin: 0;\n}\n");
    write(root, "css/theme.css", ".button {\n  color: #ff0000;\n}\n");

    let mut group = OutputGroup::new("styles", ResourceKind::Css, "style.css");
    group.source_dir = root.join("css");
    group.output_dir = root.join("dist");
    group.source_files = vec!["base.css".to_string(), "theme.css".to_string()];

    let log = Arc::new(RecordingLogSink::new());
    let outcome = pipeline(&log).run(&group).unwrap();

    assert_eq!(outcome.minified[0].engine, "css");
    let minified = fs::read_to_string(root.join("dist/style.min.css")).unwrap();
    assert!(minified.contains("body"));
    assert!(minified.contains(".button"));
    assert!(!minified.contains("base */"));
    assert!(outcome.reports[0].minified_size < outcome.reports[0].original_size);
}

#[tokio::test]
async fn test_service_runs_groups_independently() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write(root, "src/a.js", "var a = 1;   // first\n");
    write(root, "css/site.css", "p {  color: red;  }\n");

    let scripts = js_group(root, &["a.js"]);

    let mut broken = OutputGroup::new("broken", ResourceKind::Css, "site.css");
    broken.source_dir = root.join("css");
    broken.output_dir = root.join("out");
    broken.source_files = vec!["site.css".to_string()];
    broken.engine = Some("bogus".to_string());

    let log: Arc<dyn LogSink> = Arc::new(RecordingLogSink::new());
    let service = MinifyService::new(Arc::new(EngineRegistry::builtin()), log);
    let results = service.run_all(vec![scripts, broken]).await;

    assert_eq!(results.len(), 2);
    let outcome = results[0].as_ref().unwrap();
    assert_eq!(outcome.group, "scripts");
    assert!(root.join("dist/app.min.js").exists());

    let err = results[1].as_ref().unwrap_err();
    assert_eq!(err.group, "broken");
    assert_eq!(err.stage, PipelineState::Minifying);
    assert!(err.source.is_config());
}
