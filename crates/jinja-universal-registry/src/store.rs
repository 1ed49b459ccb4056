//! Load/save for `languages.toml`.
//!
//! Loading aggregates every structural violation into one error. Saving
//! renders a stable format (header comment, one table per id) and replaces
//! the file atomically so a concurrent reader never sees a partial write.

use crate::error::ConfigError;
use crate::model::{LanguageDescriptor, Registry, entry_violations};
use serde::Deserialize;
use std::io::Write as _;
use std::path::Path;

const REGISTRY_HEADER: &str = "# Languages configuration for jinja-universal\n\
# source: native (Zed built-in), extension (Zed extension), extra (manual)\n\n";

/// Load and fully validate the registry. An empty registry is an error
/// here; use [`load_lenient`] where a missing file is acceptable.
pub fn load(path: &Path) -> Result<Registry, ConfigError> {
    let text = read(path)?;
    parse(&text, path, false)
}

/// Load for the sync path: a missing file yields an empty registry (sync
/// can populate it), but an existing file is still fully validated.
pub fn load_lenient(path: &Path) -> Result<Registry, ConfigError> {
    if !path.exists() {
        return Ok(Registry::new());
    }
    let text = read(path)?;
    parse(&text, path, true)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(text: &str, path: &Path, allow_empty: bool) -> Result<Registry, ConfigError> {
    // A file that does not parse at all is reported alone; entry-level
    // checks are meaningless without a parse.
    let table: toml::Table = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    let mut registry = Registry::new();
    let mut problems = Vec::new();

    for (id, value) in table {
        if !value.is_table() {
            problems.push(format!("[{id}] expected a table, got {}", value.type_str()));
            continue;
        }
        match LanguageDescriptor::deserialize(value) {
            Ok(descriptor) => {
                problems.extend(entry_violations(&id, &descriptor));
                registry.insert(id, descriptor);
            }
            Err(err) => problems.push(format!("[{id}] {err}")),
        }
    }

    if registry.is_empty() && problems.is_empty() && !allow_empty {
        problems.push("registry is empty".to_string());
    }

    if problems.is_empty() {
        Ok(registry)
    } else {
        Err(ConfigError::Invalid(problems))
    }
}

/// Save in canonical sorted-by-id order.
pub fn save(path: &Path, registry: &Registry) -> Result<(), ConfigError> {
    write_atomic(path, &render(&registry.sorted())?)
}

/// Save keeping the registry's current entry order.
pub fn save_preserving_order(path: &Path, registry: &Registry) -> Result<(), ConfigError> {
    write_atomic(path, &render(registry)?)
}

fn render(registry: &Registry) -> Result<String, ConfigError> {
    let mut out = String::from(REGISTRY_HEADER);
    for (id, descriptor) in registry.iter() {
        out.push_str(&format!("[{id}]\n"));
        let body = toml::to_string(descriptor).map_err(|source| ConfigError::Serialize {
            id: id.to_string(),
            source,
        })?;
        out.push_str(&body);
        out.push('\n');
    }
    Ok(out)
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new("."))).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    const VALID: &str = r#"
[yaml]
name = "YAML"
zed_language = "yaml"
extensions = ["yaml", "yml"]
source = "native"

[make]
name = "Make"
zed_language = "make"
filenames = ["Makefile"]
source = "extension"
"#;

    fn write_registry(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("languages.toml");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn load_keeps_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, VALID);
        let registry = load(&path).unwrap();
        let ids: Vec<&str> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["yaml", "make"]);
        assert_eq!(registry.get("yaml").unwrap().source, Source::Native);
    }

    #[test]
    fn load_collects_every_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            &dir,
            r#"
[first]
name = "First"
zed_language = "first"
source = "bogus"
extensions = []

[second]
zed_language = ""
extensions = []
"#,
        );
        let err = load(&path).unwrap_err();
        let ConfigError::Invalid(problems) = err else {
            panic!("expected Invalid, got {err}");
        };
        // first: bad source enum; second: missing name + empty zed_language
        assert!(problems.iter().any(|p| p.starts_with("[first]")));
        assert!(
            problems
                .iter()
                .filter(|p| p.starts_with("[second]"))
                .count()
                >= 1
        );
        assert!(problems.len() >= 2);
    }

    #[test]
    fn unknown_source_string_is_rejected_at_the_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            &dir,
            "[x]\nname = \"X\"\nzed_language = \"x\"\nextensions = []\nsource = \"builtin\"\n",
        );
        assert!(matches!(load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_detection_fields_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, "[x]\nname = \"X\"\nzed_language = \"x\"\n");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("missing detection fields"));
    }

    #[test]
    fn empty_file_fails_strict_load_but_not_lenient() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, "");
        assert!(load(&path).is_err());
        assert!(load_lenient(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_fine_for_lenient_load() {
        let dir = tempfile::tempdir().unwrap();
        let registry = load_lenient(&dir.path().join("languages.toml")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn save_load_round_trips_semantically() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, VALID);
        let registry = load(&path).unwrap();

        let saved = dir.path().join("saved.toml");
        save(&saved, &registry).unwrap();
        let reloaded = load(&saved).unwrap();

        assert_eq!(registry.sorted(), reloaded);
        // Canonical order is sorted by id.
        let ids: Vec<&str> = reloaded.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["make", "yaml"]);
    }

    #[test]
    fn save_preserving_order_keeps_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, VALID);
        let registry = load(&path).unwrap();
        save_preserving_order(&path, &registry).unwrap();
        let ids: Vec<String> = load(&path)
            .unwrap()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(ids, vec!["yaml", "make"]);
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, VALID);
        let registry = load(&path).unwrap();
        save(&path, &registry).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("languages.toml")]);
    }
}
