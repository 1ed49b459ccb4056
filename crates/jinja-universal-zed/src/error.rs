use std::path::PathBuf;

/// Errors from upstream discovery.
///
/// Every variant names what was expected and where; a fetch that finds
/// nothing must fail loudly rather than report an empty upstream.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("git {action} failed for {what}: {detail}")]
    Git {
        action: &'static str,
        what: String,
        detail: String,
    },

    #[error("expected upstream path not found: {} (Zed repo layout may have changed)", .0.display())]
    MissingPath(PathBuf),

    #[error("{0}")]
    Structure(String),

    #[error("io error at {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("too many fetch failures ({failed}/{total}) - network issue or upstream layout changed")]
    TooManyFailures { failed: usize, total: usize },
}
