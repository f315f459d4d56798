use super::common::{break_lines, read_text, write_text};
use crate::core::interfaces::{Engine, EngineContext};
use crate::core::models::{EngineOptions, ResourceKind};
use crate::utils::{MinceError, Result};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use std::io::{Read, Write};

/// Which oxc passes to run over a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OxcPasses {
    mangle: bool,
    compress: bool,
}

/// Merged scripts are parsed as classic scripts so that top-level bindings
/// stay global; only `.mjs` artifacts are treated as modules.
fn source_type_for(file_name: &str) -> SourceType {
    if file_name.ends_with(".mjs") {
        SourceType::mjs()
    } else {
        SourceType::cjs()
    }
}

fn parse_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| format!("Parse error: {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse, optionally compress and mangle, and print `source` without
/// whitespace or comments.
fn minify_script(source: &str, file_name: &str, engine: &str, passes: OxcPasses) -> Result<String> {
    let allocator = Allocator::default();
    let parse_result = Parser::new(&allocator, source, source_type_for(file_name)).parse();

    if parse_result.panicked || !parse_result.errors.is_empty() {
        return Err(MinceError::compression(
            engine,
            file_name,
            parse_errors(&parse_result.errors),
        ));
    }

    let mut program = parse_result.program;
    let options = MinifierOptions {
        mangle: passes.mangle.then(MangleOptions::default),
        compress: passes.compress.then(CompressOptions::default),
        ..Default::default()
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(code)
}

/// Byte offsets where each top-level statement of `code` ends
fn statement_ends(code: &str, file_name: &str, engine: &str) -> Result<Vec<usize>> {
    let allocator = Allocator::default();
    let parse_result = Parser::new(&allocator, code, source_type_for(file_name)).parse();

    if parse_result.panicked || !parse_result.errors.is_empty() {
        return Err(MinceError::compression(
            engine,
            file_name,
            format!("minified output does not parse: {}", parse_errors(&parse_result.errors)),
        ));
    }

    Ok(parse_result
        .program
        .body
        .iter()
        .map(|statement| statement.span().end as usize)
        .collect())
}

/// Terminate every top-level statement that does not already end in `;`
/// or `}`. Returns the new text and the shifted statement ends.
fn terminate_statements(code: &str, ends: &[usize]) -> (String, Vec<usize>) {
    let mut output = String::with_capacity(code.len() + ends.len());
    let mut shifted = Vec::with_capacity(ends.len());
    let mut copied = 0;

    for &end in ends {
        output.push_str(&code[copied..end]);
        copied = end;
        if !matches!(output.chars().last(), Some(';') | Some('}') | None) {
            output.push(';');
        }
        shifted.push(output.len());
    }

    output.push_str(&code[copied..]);
    (output, shifted)
}

/// General purpose compressor: strips whitespace and comments and applies
/// conservative rewrites.
///
/// Honours every [`EngineOptions`] field: `munge_variables` shortens local
/// identifiers, `disable_micro_optimizations` skips the compression pass,
/// `preserve_semicolons` keeps an explicit `;` after each top-level
/// statement, `line_break_column` wraps after statements and
/// `verbose_logging` reports what was done.
pub struct LegacyJsEngine;

impl LegacyJsEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LegacyJsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for LegacyJsEngine {
    fn name(&self) -> &str {
        "legacy"
    }

    fn aliases(&self) -> &[&str] {
        &["yui"]
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::JavaScript
    }

    fn compress(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        options: &EngineOptions,
        context: &EngineContext<'_>,
    ) -> Result<()> {
        let source = read_text(input, &options.character_encoding, self.name(), context.file_name)?;

        let passes = OxcPasses {
            mangle: options.munge_variables,
            compress: !options.disable_micro_optimizations,
        };
        if options.verbose_logging {
            context.log.info(&format!(
                "Compressing {} ({} chars, munge: {}, micro-optimizations: {})",
                context.file_name,
                source.chars().count(),
                passes.mangle,
                passes.compress
            ));
        }

        let mut code = minify_script(&source, context.file_name, self.name(), passes)?;

        if options.preserve_semicolons || options.line_break_column.is_some() {
            let mut ends = statement_ends(&code, context.file_name, self.name())?;
            if options.verbose_logging {
                context.log.info(&format!(
                    "{} top-level statements in {}",
                    ends.len(),
                    context.file_name
                ));
            }

            if options.preserve_semicolons {
                let (terminated, shifted) = terminate_statements(&code, &ends);
                code = terminated;
                ends = shifted;
            }
            if let Some(column) = options.line_break_column {
                code = break_lines(&code, &ends, column);
            }
        }

        write_text(output, &code, &options.character_encoding, self.name(), context.file_name)
    }
}

/// Optimizing compiler: always runs the full compression and mangling
/// passes.
///
/// Only `character_encoding` is honoured; munge, verbose, semicolon,
/// micro-optimization and line break settings are ignored.
pub struct OptimizingJsEngine;

impl OptimizingJsEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OptimizingJsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for OptimizingJsEngine {
    fn name(&self) -> &str {
        "optimizing"
    }

    fn aliases(&self) -> &[&str] {
        &["closure"]
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::JavaScript
    }

    fn compress(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        options: &EngineOptions,
        context: &EngineContext<'_>,
    ) -> Result<()> {
        let source = read_text(input, &options.character_encoding, self.name(), context.file_name)?;
        context
            .log
            .debug("Using the optimizing compiler engine.");

        let passes = OxcPasses {
            mangle: true,
            compress: true,
        };
        let code = minify_script(&source, context.file_name, self.name(), passes)?;

        write_text(output, &code, &options.character_encoding, self.name(), context.file_name)
    }
}
