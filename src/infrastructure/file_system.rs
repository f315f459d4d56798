use crate::core::models::{OutputGroup, SourceFileSet};
use crate::utils::{MinceError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\\/]+").unwrap());

/// Suffix appended to the merged file when it must not clash with the
/// minified output name
pub const TEMP_SUFFIX: &str = ".tmp";

/// An include/exclude pattern such as `**/*.js` or `vendor/?query.js`.
///
/// `**` spans directories, `*` and `?` stay within one path segment. Patterns
/// are matched against paths relative to the source directory, using `/`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    raw: String,
    regex: Regex,
}

impl FilePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let normalized = SEPARATORS.replace_all(pattern.trim(), "/");
        let normalized = normalized.trim_start_matches("./").trim_start_matches('/');

        let mut regex = String::from("^");
        let mut chars = normalized.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        regex.push_str("(?:.*/)?");
                    } else {
                        regex.push_str(".*");
                    }
                }
                '*' => regex.push_str("[^/]*"),
                '?' => regex.push_str("[^/]"),
                other => regex.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex.push('$');

        Ok(Self {
            raw: pattern.to_string(),
            regex: Regex::new(&regex)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, relative: &Path) -> bool {
        self.regex.is_match(&to_slash(relative))
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Join `relative` onto `root`, refusing paths that leave `root`
pub fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() || candidate.has_root() {
        return Err(MinceError::config(format!(
            "source file '{}' must be relative to the source directory",
            relative
        )));
    }

    let mut depth: usize = 0;
    for component in candidate.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    MinceError::config(format!(
                        "source file '{}' resolves outside of {}",
                        relative,
                        root.display()
                    ))
                })?;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(MinceError::config(format!(
                    "source file '{}' must be relative to the source directory",
                    relative
                )));
            }
        }
    }

    Ok(root.join(candidate))
}

/// Every regular file below `root`, as paths relative to it, sorted
pub fn scan_directory(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let dir = root.join(&relative);
        let entries = fs::read_dir(&dir).map_err(|e| MinceError::io(&dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| MinceError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| MinceError::io(entry.path(), e))?;
            let child = relative.join(entry.file_name());

            if file_type.is_dir() {
                pending.push(child);
            } else if file_type.is_file() {
                found.push(child);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Build the ordered source list for `group`.
///
/// Explicit `source_files` come first, in configuration order and with
/// duplicates kept. Files matching an include pattern and no exclude pattern
/// follow in sorted order, skipping any already listed.
pub fn collect_sources(group: &OutputGroup) -> Result<SourceFileSet> {
    let mut sources = SourceFileSet::new();

    for file in &group.source_files {
        sources.push(resolve_under(&group.source_dir, file)?);
    }

    if group.source_includes.is_empty() || !group.source_dir.is_dir() {
        return Ok(sources);
    }

    let includes = group
        .source_includes
        .iter()
        .map(|p| FilePattern::new(p))
        .collect::<Result<Vec<_>>>()?;
    let excludes = group
        .source_excludes
        .iter()
        .map(|p| FilePattern::new(p))
        .collect::<Result<Vec<_>>>()?;

    for relative in scan_directory(&group.source_dir)? {
        let included = includes.iter().any(|p| p.matches(&relative));
        let excluded = excludes.iter().any(|p| p.matches(&relative));
        if included && !excluded {
            sources.push_unique(group.source_dir.join(&relative));
        }
    }

    Ok(sources)
}

fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], Some(&filename[pos + 1..])),
        _ => (filename, None),
    }
}

/// Name of the minified file: `app.js` becomes `app.min.js`, or stays
/// `app.js` when `nosuffix` is set
pub fn minified_file_name(filename: &str, suffix: &str, nosuffix: bool) -> String {
    if nosuffix {
        return filename.to_string();
    }

    match split_extension(filename) {
        (stem, Some(ext)) => format!("{}{}.{}", stem, suffix, ext),
        (stem, None) => format!("{}{}", stem, suffix),
    }
}

/// Name of the merged file, moved aside when it would collide with the
/// minified output
pub fn merged_file_name(filename: &str, collides: bool) -> String {
    if collides {
        format!("{}{}", filename, TEMP_SUFFIX)
    } else {
        filename.to_string()
    }
}
