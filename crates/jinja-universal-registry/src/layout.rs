//! Repository layout: every path the maintenance commands touch, resolved
//! once from the repo root and passed around explicitly.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Render templates the generator needs.
pub const REQUIRED_TEMPLATES: [&str; 2] = ["config.toml.template", "injections.scm.template"];

/// Shared rule files copied verbatim into every generated folder.
pub const BASE_RULE_FILES: [&str; 3] = ["highlights.scm", "brackets.scm", "indents.scm"];

/// Generated folders are named `<id>_jinja`.
pub const GENERATED_FOLDER_SUFFIX: &str = "_jinja";

#[derive(Debug, Clone)]
pub struct RepoLayout {
    pub root: PathBuf,
    /// The registry, `languages.toml`.
    pub config_path: PathBuf,
    /// Parent of all per-language folders.
    pub languages_dir: PathBuf,
    /// Base Jinja2 folder holding the shared rule files.
    pub jinja2_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub readme_path: PathBuf,
    /// The Zed extension manifest, `extension.toml`.
    pub manifest_path: PathBuf,
    /// Ephemeral clone/fetch cache; gitignored, safe to delete.
    pub cache_dir: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let languages_dir = root.join("languages");
        Self {
            config_path: root.join("languages.toml"),
            jinja2_dir: languages_dir.join("jinja2"),
            templates_dir: root.join("templates"),
            readme_path: root.join("README.md"),
            manifest_path: root.join("extension.toml"),
            cache_dir: root.join(".zed-cache"),
            languages_dir,
            root,
        }
    }

    pub fn generated_dir(&self, id: &str) -> PathBuf {
        self.languages_dir
            .join(format!("{id}{GENERATED_FOLDER_SUFFIX}"))
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(name)
    }

    /// Check everything `generate` needs before it mutates anything,
    /// aggregating all missing paths into one error.
    pub fn validate_generate_environment(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let required: [(&Path, &str); 6] = [
            (&self.templates_dir, "templates directory"),
            (&self.languages_dir, "languages directory"),
            (&self.jinja2_dir, "jinja2 base directory"),
            (&self.readme_path, "README.md"),
            (&self.manifest_path, "extension.toml"),
            (&self.config_path, "config file"),
        ];
        for (path, what) in required {
            if !path.exists() {
                problems.push(format!("{what} missing: {}", path.display()));
            }
        }

        if self.templates_dir.exists() {
            for name in REQUIRED_TEMPLATES {
                let path = self.template_path(name);
                if !path.exists() {
                    problems.push(format!("template file missing: {}", path.display()));
                }
            }
        }
        if self.jinja2_dir.exists() {
            for name in BASE_RULE_FILES {
                let path = self.jinja2_dir.join(name);
                if !path.exists() {
                    problems.push(format!("base rule file missing: {}", path.display()));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Environment(problems))
        }
    }

    /// Check everything `sync` needs. The config file itself may be
    /// missing (sync can create it) but its parent must exist, and git
    /// must be on PATH for the clone cache.
    pub fn validate_sync_environment(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let git_ok = Command::new("git")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !git_ok {
            problems.push("git command not found in PATH".to_string());
        }

        match self.config_path.parent() {
            Some(parent) if parent.exists() => {}
            Some(parent) => problems.push(format!(
                "config parent directory missing: {}",
                parent.display()
            )),
            None => problems.push(format!(
                "config path has no parent directory: {}",
                self.config_path.display()
            )),
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Environment(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold(root: &Path) {
        std::fs::create_dir_all(root.join("templates")).unwrap();
        std::fs::create_dir_all(root.join("languages/jinja2")).unwrap();
        for name in REQUIRED_TEMPLATES {
            std::fs::write(root.join("templates").join(name), "x").unwrap();
        }
        for name in BASE_RULE_FILES {
            std::fs::write(root.join("languages/jinja2").join(name), "x").unwrap();
        }
        std::fs::write(root.join("README.md"), "x").unwrap();
        std::fs::write(root.join("extension.toml"), "x").unwrap();
        std::fs::write(root.join("languages.toml"), "x").unwrap();
    }

    #[test]
    fn complete_environment_passes() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path());
        let layout = RepoLayout::new(dir.path());
        assert!(layout.validate_generate_environment().is_ok());
    }

    #[test]
    fn all_missing_paths_are_reported_together() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path());
        std::fs::remove_file(dir.path().join("README.md")).unwrap();
        std::fs::remove_file(dir.path().join("templates/config.toml.template")).unwrap();
        std::fs::remove_file(dir.path().join("languages/jinja2/indents.scm")).unwrap();

        let layout = RepoLayout::new(dir.path());
        let err = layout.validate_generate_environment().unwrap_err();
        let ConfigError::Environment(problems) = err else {
            panic!("expected Environment error");
        };
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn generated_dir_uses_the_folder_suffix() {
        let layout = RepoLayout::new("/repo");
        assert_eq!(
            layout.generated_dir("yaml"),
            PathBuf::from("/repo/languages/yaml_jinja")
        );
    }
}
