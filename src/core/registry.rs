// Engine registry: maps configuration names to compressor backends

use crate::core::interfaces::Engine;
use crate::infrastructure::{LegacyJsEngine, LightningCssEngine, OptimizingJsEngine};
use crate::utils::{MinceError, Result};
use std::sync::Arc;

/// Looks engines up by name or alias, falling back to a default engine when
/// no name is given.
pub struct EngineRegistry {
    engines: Vec<Arc<dyn Engine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create an empty registry whose fallback is `default_engine`
    pub fn new(default_engine: &str) -> Self {
        Self {
            engines: Vec::new(),
            default_engine: default_engine.to_string(),
        }
    }

    /// Registry with every engine shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new("legacy");
        registry.register(Arc::new(LegacyJsEngine::new()));
        registry.register(Arc::new(OptimizingJsEngine::new()));
        registry.register(Arc::new(LightningCssEngine::new()));
        registry
    }

    /// Register an engine. A later registration shadows an earlier one with
    /// the same name.
    pub fn register(&mut self, engine: Arc<dyn Engine>) {
        self.engines.insert(0, engine);
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    pub fn default_engine(&self) -> &str {
        &self.default_engine
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<dyn Engine>> {
        self.engines.iter()
    }

    /// Resolve `name` to an engine.
    ///
    /// An empty name selects the default engine; anything else that matches
    /// no name or alias is a configuration error.
    pub fn select(&self, name: &str) -> Result<Arc<dyn Engine>> {
        let wanted = name.trim();
        let wanted = if wanted.is_empty() {
            self.default_engine.as_str()
        } else {
            wanted
        };

        self.engines
            .iter()
            .find(|engine| {
                engine.name().eq_ignore_ascii_case(wanted)
                    || engine
                        .aliases()
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(wanted))
            })
            .cloned()
            .ok_or_else(|| MinceError::config(format!("unknown engine '{}'", wanted)))
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
