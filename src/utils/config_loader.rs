use crate::core::models::{OutputGroup, ResourceKind};
use crate::utils::{MinceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "mince.json";

/// Configuration file format (mince.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinceConfig {
    /// Show full paths in log output
    #[serde(default)]
    pub debug: bool,

    /// Output groups, processed independently of each other
    #[serde(default)]
    pub groups: Vec<OutputGroup>,
}

/// Settings given on the command line; each one overrides the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub debug: Option<bool>,
    pub engine: Option<String>,
    pub group: Option<String>,
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path`, resolving relative group directories against the
    /// directory that holds it
    pub fn load_from_file(path: &Path) -> Result<MinceConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| MinceError::io(path, e))?;
        let mut config: MinceConfig = serde_json::from_str(&content).map_err(|e| {
            MinceError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        for group in &mut config.groups {
            group.resolve_paths(&base);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &MinceConfig) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for group in &config.groups {
            if group.name.trim().is_empty() {
                return Err(MinceError::config("every group needs a name"));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(MinceError::config(format!(
                    "group '{}' is defined more than once",
                    group.name
                )));
            }
            if group.output_filename.trim().is_empty() {
                return Err(MinceError::config(format!(
                    "group '{}' has no outputFilename",
                    group.name
                )));
            }
        }
        Ok(())
    }

    /// Merge file config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(mut config: MinceConfig, overrides: &CliOverrides) -> Result<MinceConfig> {
        if let Some(debug) = overrides.debug {
            config.debug = debug;
        }

        if let Some(name) = overrides.group.as_deref() {
            config.groups.retain(|group| group.name == name);
            if config.groups.is_empty() {
                return Err(MinceError::config(format!("no group named '{}'", name)));
            }
        }

        if let Some(engine) = overrides.engine.as_deref() {
            for group in &mut config.groups {
                group.engine = Some(engine.to_string());
            }
        }

        Ok(config)
    }

    /// Generate example config file
    pub fn generate_example() -> String {
        let mut scripts = OutputGroup::new("scripts", ResourceKind::JavaScript, "app.js");
        scripts.source_dir = PathBuf::from("src/js");
        scripts.source_files = vec!["vendor/polyfills.js".to_string()];
        scripts.source_includes = vec!["**/*.js".to_string()];
        scripts.source_excludes = vec!["**/*.min.js".to_string()];
        scripts.output_dir = PathBuf::from("dist/js");
        scripts.engine = Some("legacy".to_string());

        let mut styles = OutputGroup::new("styles", ResourceKind::Css, "style.css");
        styles.source_dir = PathBuf::from("src/css");
        styles.source_includes = vec!["**/*.css".to_string()];
        styles.output_dir = PathBuf::from("dist/css");

        let example = MinceConfig {
            debug: false,
            groups: vec![scripts, styles],
        };
        serde_json::to_string_pretty(&example).unwrap_or_else(|_| "{}".to_string())
    }
}
