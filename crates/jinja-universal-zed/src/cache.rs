//! Clone and fetch cache for the Zed repositories.
//!
//! Shallow sparse clones of the two Zed repos live under the cache dir;
//! fetched HTTP documents are materialized under `http/` keyed by
//! sanitized URL and reused within a run. Deleting the whole directory is
//! always safe.

use crate::FetchError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const ZED_REPO_URL: &str = "https://github.com/zed-industries/zed.git";
pub const ZED_EXTENSIONS_REPO_URL: &str = "https://github.com/zed-industries/extensions.git";

pub struct ZedCache {
    dir: PathBuf,
    agent: ureq::Agent,
}

impl ZedCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .user_agent("jinja-universal-sync")
            .build();
        Self {
            dir: dir.into(),
            agent,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn zed_repo(&self) -> PathBuf {
        self.dir.join("zed")
    }

    pub fn extensions_repo(&self) -> PathBuf {
        self.dir.join("extensions")
    }

    /// Clone or update the Zed source tree, narrowed to the files native
    /// discovery reads.
    pub fn ensure_zed_repo(&self) -> Result<PathBuf, FetchError> {
        let path = self.zed_repo();
        self.ensure_repo(ZED_REPO_URL, &path, "zed-industries/zed")?;
        run_git(
            &["sparse-checkout", "set", "Cargo.toml", "crates/languages/src"],
            Some(&path),
        )?;
        run_git(&["checkout"], Some(&path))?;
        Ok(path)
    }

    pub fn ensure_extensions_repo(&self) -> Result<PathBuf, FetchError> {
        let path = self.extensions_repo();
        self.ensure_repo(ZED_EXTENSIONS_REPO_URL, &path, "zed-industries/extensions")?;
        Ok(path)
    }

    fn ensure_repo(&self, url: &str, path: &Path, name: &str) -> Result<(), FetchError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| FetchError::Io {
            path: self.dir.clone(),
            source,
        })?;

        if path.exists() {
            println!("  Updating {name}...");
            if run_git(&["pull", "--ff-only"], Some(path)).is_err() {
                // Shallow clones drift; a fresh clone is cheaper than surgery.
                eprintln!("  warning: git pull failed, recloning {name}");
                std::fs::remove_dir_all(path).map_err(|source| FetchError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                return self.ensure_repo(url, path, name);
            }
            return Ok(());
        }

        println!("  Cloning {name}...");
        let path_str = path.to_string_lossy();
        run_git(
            &[
                "clone",
                "--depth",
                "1",
                "--filter=blob:none",
                "--sparse",
                url,
                &path_str,
            ],
            None,
        )
    }

    /// Fetch a text document, consulting and filling the on-disk HTTP
    /// cache. `None` means unreachable or non-2xx; callers probing
    /// multiple candidate URLs rely on that.
    pub fn fetch_text(&self, url: &str) -> Option<String> {
        if let Some(cached) = self.read_http_cache(url) {
            tracing::debug!(url, "http cache hit");
            return Some(cached);
        }
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url, error = %err, "fetch failed");
                return None;
            }
        };
        let body = response.into_string().ok()?;
        self.write_http_cache(url, &body);
        tracing::debug!(url, bytes = body.len(), "fetched");
        Some(body)
    }

    fn http_cache_path(&self, url: &str) -> PathBuf {
        let safe: String = url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join("http").join(safe)
    }

    fn read_http_cache(&self, url: &str) -> Option<String> {
        std::fs::read_to_string(self.http_cache_path(url)).ok()
    }

    fn write_http_cache(&self, url: &str, body: &str) {
        let path = self.http_cache_path(url);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        // Cache is best-effort; a failed write only costs a refetch.
        let _ = std::fs::write(&path, body);
    }
}

fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<(), FetchError> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    let what = cwd
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| args.last().unwrap_or(&"git").to_string());
    let action: &'static str = match args.first() {
        Some(&"clone") => "clone",
        Some(&"pull") => "pull",
        Some(&"sparse-checkout") => "sparse-checkout",
        Some(&"checkout") => "checkout",
        _ => "command",
    };
    let output = command.output().map_err(|err| FetchError::Git {
        action,
        what: what.clone(),
        detail: err.to_string(),
    })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(FetchError::Git {
            action,
            what,
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
