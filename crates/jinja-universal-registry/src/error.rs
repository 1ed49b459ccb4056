use std::path::PathBuf;

/// Errors from loading, validating, or saving the registry.
///
/// `Invalid` and `Environment` carry every problem found in one pass so a
/// user can fix them all before rerunning.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },

    #[error("failed to serialize registry entry [{id}]: {source}")]
    Serialize { id: String, source: toml::ser::Error },

    #[error("{}", render_problems("registry validation failed", .0))]
    Invalid(Vec<String>),

    #[error("{}", render_problems("environment validation failed", .0))]
    Environment(Vec<String>),
}

fn render_problems(header: &str, problems: &[String]) -> String {
    let mut out = String::from(header);
    for problem in problems {
        out.push_str("\n  - ");
        out.push_str(problem);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_problem() {
        let err = ConfigError::Invalid(vec![
            "[a] missing required field: name".to_string(),
            "[b] invalid source".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.contains("registry validation failed"));
        assert!(text.contains("[a] missing required field: name"));
        assert!(text.contains("[b] invalid source"));
    }
}
