//! Discovery of what Zed supports, and reconciliation against the local
//! registry.
//!
//! Two external sets matter: languages built into Zed itself (enumerated
//! from a sparse clone of the Zed source tree) and languages provided by
//! grammar-carrying Zed extensions (enumerated from the extensions index).
//! Fetched material lands in an ephemeral cache directory; it is never
//! authoritative, only a speed optimization.

pub mod cache;
pub mod classify;
pub mod error;
pub mod extensions;
pub mod native;
pub mod reconcile;
pub mod toml_scan;

pub use cache::ZedCache;
pub use error::FetchError;

use jinja_universal_registry::Source;

/// One language as seen upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageInfo {
    /// Registry id derived from the upstream slug.
    pub id: String,
    pub name: String,
    pub zed_language: String,
    pub extensions: Vec<String>,
    pub source: Source,
    /// Normalized grammar repository signature; empty when unknown.
    pub grammar_signature: String,
}

/// Registry id for an upstream slug: lowercase, `-` folded to `_`.
pub fn language_id(slug: &str) -> String {
    slug.to_lowercase().replace('-', "_")
}

/// Best-effort display name when the upstream config has none.
pub fn display_name_from_slug(slug: &str) -> String {
    slug.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical form of a grammar repository URL for identity comparisons.
pub fn normalize_repo_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.to_lowercase()
}

/// Identity of a grammar: its repository plus an optional in-repo path
/// (monorepos host several grammars under one URL).
pub fn grammar_signature(repository: &str, path: Option<&str>) -> String {
    let repository = normalize_repo_url(repository);
    match path.map(|p| p.trim().trim_matches('/').to_lowercase()) {
        Some(path) if !path.is_empty() => format!("{repository}#{path}"),
        _ => repository,
    }
}

/// Reduce raw `path_suffixes` values to plain extension tokens: leading
/// dots and `*.` globs are stripped, anything still containing a glob or a
/// path separator is dropped.
pub fn extract_extensions(path_suffixes: &[String]) -> Vec<String> {
    let mut extensions = Vec::new();
    for raw in path_suffixes {
        let mut token = raw.as_str();
        token = token.strip_prefix('.').unwrap_or(token);
        if let Some(rest) = token.strip_prefix('*') {
            token = rest.strip_prefix('.').unwrap_or(rest);
        }
        if token.is_empty() || token.contains('*') || token.contains('/') {
            continue;
        }
        if !extensions.iter().any(|existing| existing == token) {
            extensions.push(token.to_string());
        }
    }
    extensions
}
