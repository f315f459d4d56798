use super::common::{break_lines, read_text, write_text};
use crate::core::interfaces::{Engine, EngineContext};
use crate::core::models::{EngineOptions, ResourceKind};
use crate::utils::{MinceError, Result};
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions as CssParserOptions, StyleSheet},
};
use std::io::{Read, Write};

/// CSS engine backed by Lightning CSS.
///
/// Honours `line_break_column` (breaks after `}`), `disable_micro_optimizations`
/// (prints compactly without merging or shortening rules), `verbose_logging`
/// and `character_encoding`. Munge and semicolon settings do not apply to CSS.
pub struct LightningCssEngine;

impl LightningCssEngine {
    pub fn new() -> Self {
        Self
    }

    fn minify_css(
        &self,
        source: &str,
        file_name: &str,
        options: &EngineOptions,
        context: &EngineContext<'_>,
    ) -> Result<String> {
        let mut stylesheet = StyleSheet::parse(
            source,
            CssParserOptions {
                filename: file_name.to_string(),
                ..CssParserOptions::default()
            },
        )
        .map_err(|e| MinceError::compression(self.name(), file_name, format!("CSS parse error: {}", e)))?;

        if options.verbose_logging {
            context.log.info(&format!(
                "Compressing {} ({} top-level rules)",
                file_name,
                stylesheet.rules.0.len()
            ));
        }

        if !options.disable_micro_optimizations {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|e| MinceError::compression(self.name(), file_name, e.to_string()))?;
        }

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| MinceError::compression(self.name(), file_name, e.to_string()))?;

        Ok(printed.code)
    }
}

impl Default for LightningCssEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Offsets just past every `}` that is not inside a string
fn rule_ends(code: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in code.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '}' => ends.push(idx + 1),
            _ => {}
        }
    }

    ends
}

impl Engine for LightningCssEngine {
    fn name(&self) -> &str {
        "css"
    }

    fn aliases(&self) -> &[&str] {
        &["lightningcss"]
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Css
    }

    fn compress(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        options: &EngineOptions,
        context: &EngineContext<'_>,
    ) -> Result<()> {
        let source = read_text(input, &options.character_encoding, self.name(), context.file_name)?;

        let mut code = self.minify_css(&source, context.file_name, options, context)?;
        if let Some(column) = options.line_break_column {
            code = break_lines(&code, &rule_ends(&code), column);
        }

        write_text(output, &code, &options.character_encoding, self.name(), context.file_name)
    }
}
