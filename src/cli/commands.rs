use crate::core::{EngineRegistry, LogSink, MinifyService};
use crate::utils::{
    CliOverrides, ConfigLoader, Logger, Timer, TracingLogSink, DEFAULT_CONFIG_FILE,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mince")]
#[command(about = "Merge and minify JavaScript and CSS resources")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge and minify every configured output group
    Build {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Only run the named group
        #[arg(short, long)]
        group: Option<String>,
        /// Engine to use for every group, overriding the configuration
        #[arg(short, long)]
        engine: Option<String>,
        /// Show full file paths in log output
        #[arg(long)]
        debug: bool,
    },
    /// List the available engines
    Engines,
    /// Print an example configuration file
    Init,
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let cli = Cli::parse();

        match cli.command {
            Commands::Build {
                config,
                group,
                engine,
                debug,
            } => {
                Logger::init(debug);
                let overrides = CliOverrides {
                    debug: debug.then_some(true),
                    engine,
                    group,
                };
                self.handle_build_command(config, overrides).await
            }
            Commands::Engines => {
                Logger::init(false);
                self.handle_engines_command();
                Ok(())
            }
            Commands::Init => {
                println!("{}", ConfigLoader::generate_example());
                Ok(())
            }
        }
    }

    async fn handle_build_command(
        &self,
        config_path: PathBuf,
        overrides: CliOverrides,
    ) -> anyhow::Result<()> {
        let config = ConfigLoader::load_from_file(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        let config = ConfigLoader::merge_with_cli(config, &overrides)?;

        if config.groups.is_empty() {
            tracing::warn!("No output groups configured in {}", config_path.display());
            return Ok(());
        }

        tracing::info!("🔨 Processing {} output group(s)", config.groups.len());
        let _timer = Timer::start("Building output groups");

        let log: Arc<dyn LogSink> = Arc::new(TracingLogSink);
        let service = MinifyService::new(Arc::new(EngineRegistry::builtin()), log)
            .with_debug(config.debug);

        let results = service.run_all(config.groups).await;

        let mut failed = 0;
        for result in &results {
            match result {
                Ok(outcome) => {
                    for report in &outcome.reports {
                        tracing::info!("✅ [{}] {}", outcome.group, report);
                    }
                }
                Err(err) => {
                    failed += 1;
                    tracing::error!("❌ {}", err);
                }
            }
        }

        if failed > 0 {
            bail!("{} of {} output group(s) failed", failed, results.len());
        }
        Ok(())
    }

    fn handle_engines_command(&self) {
        let registry = EngineRegistry::builtin();
        for engine in registry.engines() {
            let default = if engine.name() == registry.default_engine() {
                " (default)"
            } else {
                ""
            };
            tracing::info!(
                "{} [{}] aliases: {}{}",
                engine.name(),
                engine.kind(),
                engine.aliases().join(", "),
                default
            );
        }
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
