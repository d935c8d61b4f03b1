//! PHP literal quoting.

use crate::schema::Value;
use std::fmt::Write;

/// Escape for a double-quoted PHP string: `"`, `\` and `$` get a backslash.
pub fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Double-quoted escaping for raw bytes; ASCII control bytes and bytes
/// that are not part of a valid UTF-8 sequence become `\xNN` escapes.
pub fn escape_double_quoted_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c.is_ascii_control() {
                let _ = write!(out, "\\x{:02X}", c as u32);
            } else {
                if matches!(c, '"' | '\\' | '$') {
                    out.push('\\');
                }
                out.push(c);
            }
        }
        for b in chunk.invalid() {
            let _ = write!(out, "\\x{b:02X}");
        }
    }
    out
}

/// Escape for a single-quoted PHP string: `'` and `\` get a backslash.
pub fn escape_single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if matches!(c, '\'' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `"value"` with double-quote escaping applied
pub fn double_quoted(value: &str) -> String {
    format!("\"{}\"", escape_double_quoted(value))
}

/// `'value'` with single-quote escaping applied
pub fn single_quoted(value: &str) -> String {
    format!("'{}'", escape_single_quoted(value))
}

/// PHP literal for a row value
pub fn value_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Text(text) => double_quoted(text),
        Value::Binary(bytes) => format!("\"{}\"", escape_double_quoted_bytes(bytes)),
    }
}

/// Two spaces per level
pub fn indent(level: usize) -> String {
    "  ".repeat(level)
}
