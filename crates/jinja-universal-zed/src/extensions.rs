//! Discovery of grammar-carrying Zed extensions.
//!
//! The extensions index repo lists every published extension as a git
//! submodule; each extension's `extension.toml` (fetched raw from its own
//! repo) declares the grammars it bundles. Only grammar-carrying
//! extensions define languages; LSP-only and theme extensions are
//! skipped. Extensions re-exporting a grammar Zed already ships, or a
//! grammar another extension already claimed, are deduplicated by
//! grammar signature.

use crate::cache::ZedCache;
use crate::{
    FetchError, LanguageInfo, display_name_from_slug, extract_extensions, grammar_signature,
    language_id, toml_scan,
};
use jinja_universal_registry::Source;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

/// One extension from the index: submodule id and its repository URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionEntry {
    pub id: String,
    pub url: String,
}

/// A grammar declared in an extension manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarBinding {
    pub name: String,
    pub repository: Option<String>,
    pub path: Option<String>,
}

impl GrammarBinding {
    /// Grammar identity, or `None` when the manifest never named a
    /// repository (legacy manifests omit it; those grammars can only be
    /// deduplicated by name).
    pub fn signature(&self) -> Option<String> {
        self.repository
            .as_deref()
            .map(|repo| grammar_signature(repo, self.path.as_deref()))
    }
}

/// Outcome of scanning the extensions index.
pub struct ExtensionScan {
    pub languages: Vec<LanguageInfo>,
    /// Extension grammars dropped because Zed ships the same grammar.
    pub skipped_native_reexports: Vec<String>,
    /// Extension grammars dropped because an earlier extension claimed them.
    pub skipped_duplicates: Vec<String>,
}

/// Decision for one grammar binding during deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// First claim on this grammar; carries the language id it gets.
    Accepted { id: String },
    /// Zed ships the same grammar; the binding is a re-export.
    NativeReexport,
    /// An earlier binding claimed the same signature or language id.
    Duplicate,
}

/// First-claim-wins bookkeeping over grammar signatures and language ids.
///
/// Bindings are offered in extensions-index order, so "first" means first
/// in that order. Signature-less bindings (legacy manifests) cannot be
/// compared by repository and fall back to language-id identity.
pub struct GrammarClaims<'a> {
    native_signatures: &'a BTreeSet<String>,
    claimed: HashSet<String>,
    seen_ids: HashSet<String>,
}

impl<'a> GrammarClaims<'a> {
    pub fn new(native_signatures: &'a BTreeSet<String>) -> Self {
        Self {
            native_signatures,
            claimed: HashSet::new(),
            seen_ids: HashSet::new(),
        }
    }

    pub fn claim(&mut self, binding: &GrammarBinding) -> ClaimOutcome {
        match binding.signature() {
            Some(signature) if self.native_signatures.contains(&signature) => {
                return ClaimOutcome::NativeReexport;
            }
            Some(signature) => {
                if !self.claimed.insert(signature) {
                    return ClaimOutcome::Duplicate;
                }
            }
            None => {}
        }
        let id = language_id(&binding.name);
        if !self.seen_ids.insert(id.clone()) {
            return ClaimOutcome::Duplicate;
        }
        ClaimOutcome::Accepted { id }
    }
}

/// Enumerate languages provided by grammar-carrying extensions.
///
/// Extensions whose manifest cannot be fetched count as failures; if more
/// than half fail the whole scan is rejected as unreliable rather than
/// silently reported as a smaller upstream.
pub fn fetch_extension_languages(
    cache: &ZedCache,
    native_signatures: &BTreeSet<String>,
) -> Result<ExtensionScan, FetchError> {
    let entries = list_extensions(cache)?;
    println!("  Scanning {} extensions for grammars...", entries.len());

    let mut scan = ExtensionScan {
        languages: Vec::new(),
        skipped_native_reexports: Vec::new(),
        skipped_duplicates: Vec::new(),
    };
    let mut claims = GrammarClaims::new(native_signatures);
    let mut failures = 0usize;

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 && index % 100 == 0 {
            println!("  ...{index}/{} extensions", entries.len());
        }
        let Some(manifest) = fetch_manifest(cache, &entry.url) else {
            failures += 1;
            continue;
        };
        for binding in grammar_bindings(&manifest) {
            match claims.claim(&binding) {
                ClaimOutcome::NativeReexport => {
                    scan.skipped_native_reexports
                        .push(format!("{} ({})", binding.name, entry.id));
                }
                ClaimOutcome::Duplicate => {
                    scan.skipped_duplicates
                        .push(format!("{} ({})", binding.name, entry.id));
                }
                ClaimOutcome::Accepted { id } => {
                    scan.languages
                        .push(extension_language(cache, entry, &binding, id));
                }
            }
        }
    }

    if failures * 2 > entries.len() {
        return Err(FetchError::TooManyFailures {
            failed: failures,
            total: entries.len(),
        });
    }
    Ok(scan)
}

/// All extensions registered in the index repo, sorted by id.
pub fn list_extensions(cache: &ZedCache) -> Result<Vec<ExtensionEntry>, FetchError> {
    let repo = cache.ensure_extensions_repo()?;
    let gitmodules = repo.join(".gitmodules");
    if !gitmodules.exists() {
        return Err(FetchError::MissingPath(gitmodules));
    }
    let content = std::fs::read_to_string(&gitmodules).map_err(|source| FetchError::Io {
        path: gitmodules,
        source,
    })?;
    let entries = parse_gitmodules(&content);
    if entries.is_empty() {
        return Err(FetchError::Structure(
            "no submodules found in extensions index .gitmodules".to_string(),
        ));
    }
    Ok(entries)
}

/// Parse the extensions index `.gitmodules`: each extension is a
/// `[submodule "extensions/<id>"]` block with a `url` line.
pub fn parse_gitmodules(content: &str) -> Vec<ExtensionEntry> {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    let header = HEADER
        .get_or_init(|| Regex::new(r#"^\s*\[submodule\s+"extensions/([^"]+)"\]"#).unwrap());

    let mut entries = Vec::new();
    let mut current: Option<String> = None;
    for line in content.lines() {
        if let Some(captures) = header.captures(line) {
            current = Some(captures[1].to_string());
            continue;
        }
        if line.trim_start().starts_with('[') {
            current = None;
            continue;
        }
        if let Some(id) = &current {
            if let Some(url) = line.trim().strip_prefix("url") {
                let url = url.trim_start().strip_prefix('=').unwrap_or(url).trim();
                if !url.is_empty() {
                    entries.push(ExtensionEntry {
                        id: id.clone(),
                        url: url.to_string(),
                    });
                    current = None;
                }
            }
        }
    }
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    entries
}

/// Fetch an extension's manifest from its repository, probing the `main`
/// then `master` branch on the raw content host.
pub(crate) fn fetch_manifest(cache: &ZedCache, repo_url: &str) -> Option<String> {
    let base = raw_content_base(repo_url)?;
    for branch in ["main", "master"] {
        if let Some(body) = cache.fetch_text(&format!("{base}/{branch}/extension.toml")) {
            return Some(body);
        }
    }
    None
}

/// `raw.githubusercontent.com` base for a GitHub repository URL, without
/// the branch segment. Non-GitHub hosts are not probeable.
fn raw_content_base(repo_url: &str) -> Option<String> {
    let rest = repo_url
        .trim()
        .trim_end_matches('/')
        .strip_prefix("https://github.com/")?;
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let mut parts = rest.splitn(2, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some(format!("https://raw.githubusercontent.com/{owner}/{repo}"))
}

/// Grammars declared in a manifest.
///
/// Strict path: parse the TOML and read `[grammars.<name>]` tables that
/// pin a repository and a commit (or `rev`). Fallback path, for manifests
/// that are not valid TOML: collect the `[grammars.<name>]` headers by
/// regex, leaving repository unknown.
pub fn grammar_bindings(manifest: &str) -> Vec<GrammarBinding> {
    if let Ok(table) = manifest.parse::<toml::Table>() {
        let Some(grammars) = table.get("grammars").and_then(toml::Value::as_table) else {
            return Vec::new();
        };
        return grammars
            .iter()
            .filter_map(|(name, spec)| {
                let spec = spec.as_table()?;
                let repository = spec.get("repository").and_then(toml::Value::as_str)?;
                let pinned = spec
                    .get("commit")
                    .or_else(|| spec.get("rev"))
                    .and_then(toml::Value::as_str);
                pinned?;
                Some(GrammarBinding {
                    name: name.clone(),
                    repository: Some(repository.to_string()),
                    path: spec
                        .get("path")
                        .and_then(toml::Value::as_str)
                        .map(str::to_string),
                })
            })
            .collect();
    }

    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER
        .get_or_init(|| Regex::new(r"(?m)^\s*\[grammars\.([A-Za-z0-9_-]+)\]").unwrap())
        .captures_iter(manifest)
        .map(|captures| GrammarBinding {
            name: captures[1].to_string(),
            repository: None,
            path: None,
        })
        .collect()
}

/// Build the language record for one claimed grammar, fetching the
/// extension's language config when it is reachable.
fn extension_language(
    cache: &ZedCache,
    entry: &ExtensionEntry,
    binding: &GrammarBinding,
    id: String,
) -> LanguageInfo {
    let config = fetch_language_config(cache, &entry.url, &binding.name);
    let name = config
        .as_deref()
        .and_then(|content| toml_scan::scan_string(content, "name"))
        .unwrap_or_else(|| display_name_from_slug(&binding.name));
    let extensions = config
        .as_deref()
        .and_then(|content| toml_scan::scan_string_list(content, "path_suffixes"))
        .map(|raw| extract_extensions(&raw))
        .unwrap_or_default();
    LanguageInfo {
        id,
        name,
        zed_language: binding.name.to_lowercase(),
        extensions,
        source: Source::Extension,
        grammar_signature: binding.signature().unwrap_or_default(),
    }
}

/// Probe the usual layouts for a language config inside an extension repo.
/// Directory names do not always match the grammar name exactly, so a few
/// casing and separator variants are tried.
pub(crate) fn fetch_language_config(cache: &ZedCache, repo_url: &str, grammar: &str) -> Option<String> {
    let base = raw_content_base(repo_url)?;
    for branch in ["main", "master"] {
        for dir in language_dir_candidates(grammar) {
            let url = format!("{base}/{branch}/languages/{dir}/config.toml");
            if let Some(body) = cache.fetch_text(&url) {
                return Some(body);
            }
        }
    }
    None
}

fn language_dir_candidates(grammar: &str) -> Vec<String> {
    let candidates = vec![
        grammar.to_string(),
        grammar.replace('-', "_"),
        grammar.replace('_', "-"),
        grammar.to_lowercase(),
        display_name_from_slug(grammar),
    ];
    let mut unique = Vec::new();
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gitmodules_entries_are_sorted_by_id() {
        let content = r#"
[submodule "extensions/zig"]
	path = extensions/zig
	url = https://github.com/zigtools/zed-zig.git
[submodule "extensions/ansible"]
	path = extensions/ansible
	url = https://github.com/kartikvashistha/zed-ansible
"#;
        let entries = parse_gitmodules(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "ansible");
        assert_eq!(
            entries[0].url,
            "https://github.com/kartikvashistha/zed-ansible"
        );
        assert_eq!(entries[1].id, "zig");
    }

    #[test]
    fn gitmodules_ignores_non_extension_submodules() {
        let content = "[submodule \"vendor/thing\"]\n\turl = https://example.com/x\n";
        assert!(parse_gitmodules(content).is_empty());
    }

    #[test]
    fn raw_content_base_handles_git_suffix() {
        assert_eq!(
            raw_content_base("https://github.com/owner/repo.git").unwrap(),
            "https://raw.githubusercontent.com/owner/repo"
        );
        assert_eq!(raw_content_base("https://gitlab.com/owner/repo"), None);
    }

    #[test]
    fn grammar_bindings_require_repository_and_commit() {
        let manifest = r#"
id = "sql"
[grammars.sql]
repository = "https://github.com/o/tree-sitter-sql"
commit = "abc123"
[grammars.draft]
repository = "https://github.com/o/tree-sitter-draft"
"#;
        let bindings = grammar_bindings(manifest);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "sql");
        assert_eq!(
            bindings[0].signature().unwrap(),
            "https://github.com/o/tree-sitter-sql"
        );
    }

    #[test]
    fn rev_is_accepted_as_a_commit_pin() {
        let manifest = "[grammars.nu]\nrepository = \"https://github.com/o/r\"\nrev = \"v1\"\n";
        assert_eq!(grammar_bindings(manifest).len(), 1);
    }

    #[test]
    fn invalid_manifest_falls_back_to_headers() {
        let manifest = "[grammars.nginx]\nrepository = https://broken\n";
        let bindings = grammar_bindings(manifest);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "nginx");
        assert_eq!(bindings[0].signature(), None);
    }

    #[test]
    fn cosmetic_extensions_have_no_bindings() {
        assert!(grammar_bindings("id = \"theme-only\"\n").is_empty());
    }

    fn binding(name: &str, repository: Option<&str>) -> GrammarBinding {
        GrammarBinding {
            name: name.to_string(),
            repository: repository.map(str::to_string),
            path: None,
        }
    }

    #[test]
    fn claims_drop_native_reexports() {
        let native: BTreeSet<String> =
            ["https://github.com/zed-industries/tree-sitter-go".to_string()].into();
        let mut claims = GrammarClaims::new(&native);
        assert_eq!(
            claims.claim(&binding(
                "go",
                Some("https://github.com/zed-industries/tree-sitter-go.git"),
            )),
            ClaimOutcome::NativeReexport
        );
    }

    #[test]
    fn first_claim_wins_across_repository_url_spellings() {
        let native = BTreeSet::new();
        let mut claims = GrammarClaims::new(&native);
        assert_eq!(
            claims.claim(&binding(
                "liquid",
                Some("https://github.com/o/tree-sitter-liquid"),
            )),
            ClaimOutcome::Accepted {
                id: "liquid".to_string()
            }
        );
        // Same repository spelled with casing, a .git suffix, and a
        // trailing slash still collides.
        assert_eq!(
            claims.claim(&binding(
                "liquid-alt",
                Some("https://GitHub.com/O/tree-sitter-liquid.git/"),
            )),
            ClaimOutcome::Duplicate
        );
    }

    #[test]
    fn signature_less_bindings_collide_by_language_id() {
        let native = BTreeSet::new();
        let mut claims = GrammarClaims::new(&native);
        assert_eq!(
            claims.claim(&binding("ssh-config", None)),
            ClaimOutcome::Accepted {
                id: "ssh_config".to_string()
            }
        );
        assert_eq!(
            claims.claim(&binding("ssh_config", None)),
            ClaimOutcome::Duplicate
        );
        // A different grammar name still gets through.
        assert_eq!(
            claims.claim(&binding("nginx", None)),
            ClaimOutcome::Accepted {
                id: "nginx".to_string()
            }
        );
    }

    #[test]
    fn dir_candidates_cover_separator_variants() {
        let candidates = language_dir_candidates("ssh-config");
        assert!(candidates.contains(&"ssh-config".to_string()));
        assert!(candidates.contains(&"ssh_config".to_string()));
        assert!(candidates.contains(&"Ssh Config".to_string()));
    }
}
