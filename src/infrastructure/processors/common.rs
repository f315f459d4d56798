/// Shared plumbing for the engines: stream handling, character encodings and
/// line breaking.
use crate::utils::{MinceError, Result};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::io::{Read, Write};

/// Resolve a charset label such as `UTF-8` or `ISO-8859-1`
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| MinceError::config(format!("unsupported character encoding '{}'", label)))
}

/// Drain `input` and decode it with the encoding named by `label`.
///
/// A leading byte order mark is dropped. Malformed input is a compression
/// error rather than being silently replaced.
pub fn read_text(input: &mut dyn Read, label: &str, engine: &str, file: &str) -> Result<String> {
    let encoding = resolve_encoding(label)?;

    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .map_err(|e| MinceError::compression_caused_by(engine, file, format!("failed to read input: {}", e), e))?;

    let (text, had_errors) = encoding.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(MinceError::compression(
            engine,
            file,
            format!("input is not valid {}", encoding.name()),
        ));
    }

    Ok(text.into_owned())
}

/// Encode `text` with the encoding named by `label` and write all of it
pub fn write_text(output: &mut dyn Write, text: &str, label: &str, engine: &str, file: &str) -> Result<()> {
    let encoding = resolve_encoding(label)?;

    let bytes = if encoding == UTF_16LE {
        encode_utf16(text, u16::to_le_bytes)
    } else if encoding == UTF_16BE {
        encode_utf16(text, u16::to_be_bytes)
    } else {
        let (bytes, _, had_unmappable) = encoding.encode(text);
        if had_unmappable {
            return Err(MinceError::compression(
                engine,
                file,
                format!("output contains characters not representable in {}", encoding.name()),
            ));
        }
        bytes.into_owned()
    };

    output
        .write_all(&bytes)
        .and_then(|_| output.flush())
        .map_err(|e| MinceError::compression_caused_by(engine, file, format!("failed to write output: {}", e), e))
}

// encoding_rs only decodes UTF-16; its encoder falls back to UTF-8.
fn encode_utf16(text: &str, to_bytes: fn(u16) -> [u8; 2]) -> Vec<u8> {
    text.encode_utf16().flat_map(to_bytes).collect()
}

/// Insert a newline at each boundary once the current line has reached
/// `column` characters. A column of zero breaks at every boundary.
///
/// `boundaries` are byte offsets into `code`, ascending, each on a char
/// boundary.
pub fn break_lines(code: &str, boundaries: &[usize], column: usize) -> String {
    let mut output = String::with_capacity(code.len() + boundaries.len());
    let mut copied = 0;
    let mut line_start = 0;

    for &boundary in boundaries {
        if boundary <= copied || boundary >= code.len() {
            continue;
        }

        output.push_str(&code[copied..boundary]);
        copied = boundary;

        let current_line = &code[line_start..boundary];
        let line_len = match current_line.rfind('\n') {
            Some(pos) => current_line.len() - pos - 1,
            None => current_line.len(),
        };

        if line_len >= column && !code[boundary..].starts_with('\n') {
            output.push('\n');
            line_start = boundary;
        }
    }

    output.push_str(&code[copied..]);
    output
}
