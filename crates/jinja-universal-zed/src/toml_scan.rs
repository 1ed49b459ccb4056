//! Tolerant single-key extraction from upstream TOML documents.
//!
//! A handful of language configs in the wild are not valid TOML; when real
//! parsing fails we fall back to a line-oriented scan so one sloppy file
//! does not hide an otherwise usable value.

use regex::Regex;
use std::sync::OnceLock;

/// Extract a top-level string value for `key`.
pub fn scan_string(content: &str, key: &str) -> Option<String> {
    if let Ok(table) = content.parse::<toml::Table>() {
        return match table.get(key) {
            Some(toml::Value::String(value)) => Some(value.clone()),
            _ => None,
        };
    }
    let pattern = format!(r#"(?m)^\s*{}\s*=\s*"([^"]*)""#, regex::escape(key));
    Regex::new(&pattern)
        .ok()?
        .captures(content)
        .map(|captures| captures[1].to_string())
}

/// Extract a top-level string-list value for `key`, flattening any nested
/// lists.
pub fn scan_string_list(content: &str, key: &str) -> Option<Vec<String>> {
    if let Ok(table) = content.parse::<toml::Table>() {
        return match table.get(key) {
            Some(toml::Value::Array(values)) => Some(flatten_strings(values)),
            _ => None,
        };
    }
    let pattern = format!(r"(?m)^\s*{}\s*=\s*(\[[^\n]*)", regex::escape(key));
    let line = Regex::new(&pattern)
        .ok()?
        .captures(content)
        .map(|captures| captures[1].to_string())?;
    Some(quoted_strings(&balanced_prefix(&line)))
}

fn flatten_strings(values: &[toml::Value]) -> Vec<String> {
    let mut flattened = Vec::new();
    for value in values {
        match value {
            toml::Value::String(s) => flattened.push(s.clone()),
            toml::Value::Array(nested) => flattened.extend(flatten_strings(nested)),
            _ => {}
        }
    }
    flattened
}

/// The prefix of `value` up to the bracket that closes its first `[`.
fn balanced_prefix(value: &str) -> String {
    let mut depth = 0usize;
    for (index, c) in value.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return value[..=index].to_string();
                }
            }
            _ => {}
        }
    }
    value.to_string()
}

fn quoted_strings(value: &str) -> Vec<String> {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    QUOTED
        .get_or_init(|| Regex::new(r#""([^"]*)""#).unwrap())
        .captures_iter(value)
        .map(|captures| captures[1].to_string())
        .collect()
}
