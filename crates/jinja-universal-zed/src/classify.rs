//! Capability survey of the extensions index.
//!
//! Beyond the languages they define, extensions differ in what they ship:
//! grammars, language servers, both, or neither. The survey powers the
//! `sync --classify` report and its JSON export, which is how shared and
//! core-like grammar repositories get spotted before they cause
//! duplicate-language churn.

use crate::cache::ZedCache;
use crate::extensions::{self, ExtensionEntry};
use crate::{FetchError, toml_scan};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapabilityCategory {
    #[serde(rename = "grammar+lsp")]
    GrammarAndLsp,
    #[serde(rename = "grammar-only")]
    GrammarOnly,
    #[serde(rename = "lsp-only")]
    LspOnly,
    #[serde(rename = "none")]
    None,
}

impl CapabilityCategory {
    fn of(grammar_names: &[String], language_servers: &[String]) -> Self {
        match (!grammar_names.is_empty(), !language_servers.is_empty()) {
            (true, true) => Self::GrammarAndLsp,
            (true, false) => Self::GrammarOnly,
            (false, true) => Self::LspOnly,
            (false, false) => Self::None,
        }
    }
}

/// Everything one extension declares, as far as its manifest and language
/// configs reveal.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionCapability {
    pub extension_id: String,
    pub repo_url: String,
    pub category: CapabilityCategory,
    pub has_manifest: bool,
    pub grammar_names: Vec<String>,
    pub grammar_repositories: Vec<String>,
    pub language_servers: Vec<String>,
    /// Raw `path_suffixes` values across the extension's language configs.
    pub path_suffixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub full_filenames: Vec<String>,
    pub other_patterns: Vec<String>,
}

/// Survey every extension in the index. Fetch failures degrade to
/// manifest-less records; more than half failing rejects the survey.
pub fn collect_extension_capabilities(
    cache: &ZedCache,
) -> Result<Vec<ExtensionCapability>, FetchError> {
    let entries = extensions::list_extensions(cache)?;
    println!("  Analyzing {} extension capabilities...", entries.len());

    let mut capabilities = Vec::with_capacity(entries.len());
    let mut failures = 0usize;
    for (index, entry) in entries.iter().enumerate() {
        if index > 0 && index % 100 == 0 {
            println!("  ...{index}/{} extensions", entries.len());
        }
        let capability = parse_capability(cache, entry);
        if !capability.has_manifest {
            failures += 1;
        }
        capabilities.push(capability);
    }

    if failures * 2 > entries.len() {
        return Err(FetchError::TooManyFailures {
            failed: failures,
            total: entries.len(),
        });
    }
    Ok(capabilities)
}

fn parse_capability(cache: &ZedCache, entry: &ExtensionEntry) -> ExtensionCapability {
    let Some(manifest) = extensions::fetch_manifest(cache, &entry.url) else {
        return ExtensionCapability {
            extension_id: entry.id.clone(),
            repo_url: entry.url.clone(),
            category: CapabilityCategory::None,
            has_manifest: false,
            grammar_names: Vec::new(),
            grammar_repositories: Vec::new(),
            language_servers: Vec::new(),
            path_suffixes: Vec::new(),
            suffixes: Vec::new(),
            full_filenames: Vec::new(),
            other_patterns: Vec::new(),
        };
    };

    let (grammar_names, grammar_repositories, language_servers) = manifest_tables(&manifest);

    let mut path_suffixes = Vec::new();
    let mut suffixes = Vec::new();
    let mut full_filenames = Vec::new();
    let mut other_patterns = Vec::new();
    for grammar in &grammar_names {
        let Some(config) = extensions::fetch_language_config(cache, &entry.url, grammar) else {
            continue;
        };
        let Some(raw) = toml_scan::scan_string_list(&config, "path_suffixes") else {
            continue;
        };
        let raw = dedupe_strings(raw);
        let (s, f, o) = split_path_suffixes(&raw);
        path_suffixes.extend(raw);
        suffixes.extend(s);
        full_filenames.extend(f);
        other_patterns.extend(o);
    }

    ExtensionCapability {
        extension_id: entry.id.clone(),
        repo_url: entry.url.clone(),
        category: CapabilityCategory::of(&grammar_names, &language_servers),
        has_manifest: true,
        grammar_names,
        grammar_repositories,
        language_servers,
        path_suffixes: dedupe_strings(path_suffixes),
        suffixes: dedupe_strings(suffixes),
        full_filenames: dedupe_strings(full_filenames),
        other_patterns: dedupe_strings(other_patterns),
    }
}

/// Grammar names, their repositories, and language server names from a
/// manifest. On unparseable TOML only the grammar headers survive.
fn manifest_tables(manifest: &str) -> (Vec<String>, Vec<String>, Vec<String>) {
    if let Ok(table) = manifest.parse::<toml::Table>() {
        let grammar_names = table_keys(&table, "grammars");
        let mut repositories = Vec::new();
        if let Some(grammars) = table.get("grammars").and_then(toml::Value::as_table) {
            for spec in grammars.values() {
                if let Some(repo) = spec
                    .as_table()
                    .and_then(|spec| spec.get("repository"))
                    .and_then(toml::Value::as_str)
                {
                    repositories.push(repo.to_string());
                }
            }
        }
        let language_servers = table_keys(&table, "language_servers");
        return (grammar_names, dedupe_strings(repositories), language_servers);
    }

    static HEADER: OnceLock<Regex> = OnceLock::new();
    let names = HEADER
        .get_or_init(|| Regex::new(r"(?m)^\s*\[grammars\.([A-Za-z0-9_-]+)\]").unwrap())
        .captures_iter(manifest)
        .map(|captures| captures[1].to_string())
        .collect();
    (dedupe_strings(names), Vec::new(), Vec::new())
}

fn table_keys(table: &toml::Table, key: &str) -> Vec<String> {
    table
        .get(key)
        .and_then(toml::Value::as_table)
        .map(|inner| inner.keys().cloned().collect())
        .unwrap_or_default()
}

/// Partition raw `path_suffixes` values by what they actually match:
/// `/`-containing and multi-glob values are opaque patterns, `*.x` globs
/// and dot-prefixed values are suffixes, everything else is a literal
/// filename. Values keep their raw spelling.
pub fn split_path_suffixes(values: &[String]) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut suffixes = Vec::new();
    let mut full_filenames = Vec::new();
    let mut other_patterns = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value.contains('/') {
            other_patterns.push(value.to_string());
        } else if value.contains('*') {
            if value.starts_with("*.") && value.matches('*').count() == 1 {
                suffixes.push(value.to_string());
            } else {
                other_patterns.push(value.to_string());
            }
        } else if value.starts_with('.') {
            suffixes.push(value.to_string());
        } else {
            full_filenames.push(value.to_string());
        }
    }
    (
        dedupe_strings(suffixes),
        dedupe_strings(full_filenames),
        dedupe_strings(other_patterns),
    )
}

fn dedupe_strings(values: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

/// Map each grammar repository to the extension ids that claim it, ids
/// sorted so the report is stable.
fn repository_claims(capabilities: &[ExtensionCapability]) -> BTreeMap<String, Vec<String>> {
    let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for capability in capabilities {
        for repository in &capability.grammar_repositories {
            claims
                .entry(repository.clone())
                .or_default()
                .push(capability.extension_id.clone());
        }
    }
    for ids in claims.values_mut() {
        ids.sort();
    }
    claims
}

/// Human-readable summary of the survey.
pub fn print_capability_report(capabilities: &[ExtensionCapability]) {
    let total = capabilities.len();
    let with_manifest = capabilities.iter().filter(|c| c.has_manifest).count();
    let with_grammar = capabilities
        .iter()
        .filter(|c| !c.grammar_names.is_empty())
        .count();
    let with_lsp = capabilities
        .iter()
        .filter(|c| !c.language_servers.is_empty())
        .count();
    let both = capabilities
        .iter()
        .filter(|c| c.category == CapabilityCategory::GrammarAndLsp)
        .count();
    let grammar_only = capabilities
        .iter()
        .filter(|c| c.category == CapabilityCategory::GrammarOnly)
        .count();
    let lsp_only = capabilities
        .iter()
        .filter(|c| c.category == CapabilityCategory::LspOnly)
        .count();
    let no_features = total - both - grammar_only - lsp_only;

    let claims = repository_claims(capabilities);
    let shared: Vec<_> = claims.iter().filter(|(_, ids)| ids.len() > 1).collect();
    let core_like = claims
        .keys()
        .filter(|repo| repo.starts_with("https://github.com/zed-industries/tree-sitter-"))
        .count();

    println!();
    println!("{}", "=".repeat(60));
    println!("EXTENSION CAPABILITY REPORT");
    println!("{}", "=".repeat(60));
    println!("Total extensions analyzed: {total}");
    println!("With extension.toml: {with_manifest}");
    println!("With grammars: {with_grammar}");
    println!("With language servers: {with_lsp}");
    println!("Grammar + LSP: {both}");
    println!("Grammar-only: {grammar_only}");
    println!("LSP-only: {lsp_only}");
    println!("No grammar/LSP: {no_features}");
    println!("Unique grammar repositories: {}", claims.len());
    println!("Shared grammar repositories: {}", shared.len());
    println!("Core-like tree-sitter repositories: {core_like}");

    if !shared.is_empty() {
        println!("\nShared grammar repositories (first 20):");
        for (repository, ids) in shared.iter().take(20) {
            let names = ids
                .iter()
                .take(5)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let ellipsis = if ids.len() > 5 { "..." } else { "" };
            println!("  - {repository} ({}): {names}{ellipsis}", ids.len());
        }
    }

    let mut lsp_only_ids: Vec<&str> = capabilities
        .iter()
        .filter(|c| c.category == CapabilityCategory::LspOnly)
        .map(|c| c.extension_id.as_str())
        .collect();
    lsp_only_ids.sort();
    if !lsp_only_ids.is_empty() {
        println!(
            "\nLSP-only extensions (first 20): {}",
            lsp_only_ids
                .iter()
                .take(20)
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let mut missing: Vec<&str> = capabilities
        .iter()
        .filter(|c| !c.has_manifest)
        .map(|c| c.extension_id.as_str())
        .collect();
    missing.sort();
    if !missing.is_empty() {
        println!(
            "\nMissing extension.toml (first 20): {}",
            missing
                .iter()
                .take(20)
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Write the survey as pretty-printed JSON, creating parent directories.
pub fn write_capability_json(
    capabilities: &[ExtensionCapability],
    path: &Path,
) -> Result<(), FetchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| FetchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut payload = serde_json::to_string_pretty(capabilities).map_err(|err| {
        FetchError::Structure(format!("failed to serialize capability report: {err}"))
    })?;
    payload.push('\n');
    std::fs::write(path, payload).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}
