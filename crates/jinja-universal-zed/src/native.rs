//! Discovery of Zed's built-in languages.
//!
//! Native languages are enumerated from `crates/languages/src/*/config.toml`
//! in a sparse clone of the Zed source tree; native grammar identities come
//! from the `tree-sitter-*` git dependencies in Zed's workspace manifest.

use crate::cache::ZedCache;
use crate::{
    FetchError, LanguageInfo, display_name_from_slug, extract_extensions, grammar_signature,
    language_id, toml_scan,
};
use jinja_universal_registry::Source;
use std::collections::BTreeSet;

/// Enumerate Zed's built-in languages. An empty result is always an
/// error: it means the upstream layout changed, not that Zed dropped
/// every language.
pub fn fetch_native_languages(cache: &ZedCache) -> Result<Vec<LanguageInfo>, FetchError> {
    let repo = cache.ensure_zed_repo()?;
    let languages_dir = repo.join("crates/languages/src");
    if !languages_dir.exists() {
        return Err(FetchError::MissingPath(languages_dir));
    }

    let mut dirs: Vec<_> = std::fs::read_dir(&languages_dir)
        .map_err(|source| FetchError::Io {
            path: languages_dir.clone(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut languages = Vec::new();
    let mut parse_errors = Vec::new();
    for dir in dirs {
        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            continue;
        }
        let slug = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&config_path) {
            Ok(content) => languages.push(native_language(&slug, &content)),
            Err(err) => parse_errors.push(format!("{slug}: {err}")),
        }
    }

    if !parse_errors.is_empty() {
        eprintln!(
            "  warning: {} languages had read errors:",
            parse_errors.len()
        );
        for err in parse_errors.iter().take(5) {
            eprintln!("    - {err}");
        }
    }

    if languages.is_empty() {
        return Err(FetchError::Structure(
            "no native languages found - Zed repo structure may have changed".to_string(),
        ));
    }
    Ok(languages)
}

fn native_language(slug: &str, config: &str) -> LanguageInfo {
    let name = toml_scan::scan_string(config, "name")
        .unwrap_or_else(|| display_name_from_slug(slug));
    let extensions = toml_scan::scan_string_list(config, "path_suffixes")
        .map(|raw| extract_extensions(&raw))
        .unwrap_or_default();
    LanguageInfo {
        id: language_id(slug),
        name,
        zed_language: slug.to_lowercase(),
        extensions,
        source: Source::Native,
        grammar_signature: String::new(),
    }
}

/// Grammar signatures Zed claims natively, from the `tree-sitter-*` git
/// dependencies in its workspace `Cargo.toml`. Extension grammars that
/// re-export one of these are thin duplicates.
pub fn native_grammar_signatures(cache: &ZedCache) -> Result<BTreeSet<String>, FetchError> {
    let repo = cache.ensure_zed_repo()?;
    let manifest_path = repo.join("Cargo.toml");
    if !manifest_path.exists() {
        return Err(FetchError::MissingPath(manifest_path));
    }
    let content = std::fs::read_to_string(&manifest_path).map_err(|source| FetchError::Io {
        path: manifest_path.clone(),
        source,
    })?;
    let table: toml::Table = content.parse().map_err(|err| {
        FetchError::Structure(format!(
            "invalid Zed workspace Cargo.toml at {}: {err}",
            manifest_path.display()
        ))
    })?;

    let dependencies = table
        .get("workspace")
        .and_then(toml::Value::as_table)
        .and_then(|workspace| workspace.get("dependencies"))
        .and_then(toml::Value::as_table)
        .ok_or_else(|| {
            FetchError::Structure(
                "Zed workspace Cargo.toml has no [workspace.dependencies] section".to_string(),
            )
        })?;

    let signatures = tree_sitter_git_signatures(dependencies);
    if signatures.is_empty() {
        return Err(FetchError::Structure(
            "no native tree-sitter git repositories found in Zed workspace Cargo.toml".to_string(),
        ));
    }
    Ok(signatures)
}

fn tree_sitter_git_signatures(dependencies: &toml::Table) -> BTreeSet<String> {
    let mut signatures = BTreeSet::new();
    for (name, spec) in dependencies {
        if !name.starts_with("tree-sitter-") {
            continue;
        }
        let Some(spec) = spec.as_table() else {
            continue;
        };
        let Some(git) = spec.get("git").and_then(toml::Value::as_str) else {
            continue;
        };
        let path = spec.get("path").and_then(toml::Value::as_str);
        signatures.insert(grammar_signature(git, path));
    }
    signatures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_language_reads_name_and_extensions() {
        let config = "name = \"YAML\"\npath_suffixes = [\"yaml\", \"yml\"]\n";
        let info = native_language("yaml", config);
        assert_eq!(info.id, "yaml");
        assert_eq!(info.name, "YAML");
        assert_eq!(info.extensions, vec!["yaml", "yml"]);
        assert_eq!(info.source, Source::Native);
    }

    #[test]
    fn native_language_falls_back_to_slug_name() {
        let info = native_language("ssh-config", "grammar = \"ssh_config\"\n");
        assert_eq!(info.name, "Ssh Config");
        assert_eq!(info.id, "ssh_config");
        assert!(info.extensions.is_empty());
    }

    #[test]
    fn tree_sitter_signatures_only_cover_git_dependencies() {
        let manifest: toml::Table = r#"
[tree-sitter-rust]
git = "https://github.com/tree-sitter/tree-sitter-rust.git"

[tree-sitter-md]
git = "https://github.com/zed-industries/tree-sitter-markdown"
path = "tree-sitter-markdown"

[tree-sitter-c]
version = "0.20"

[serde]
git = "https://github.com/serde-rs/serde"
"#
        .parse()
        .unwrap();
        let signatures = tree_sitter_git_signatures(&manifest);
        assert_eq!(signatures.len(), 2);
        assert!(signatures.contains("https://github.com/tree-sitter/tree-sitter-rust"));
        assert!(
            signatures
                .contains("https://github.com/zed-industries/tree-sitter-markdown#tree-sitter-markdown")
        );
    }
}
