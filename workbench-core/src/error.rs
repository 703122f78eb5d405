//! Error types for workbench-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a remote collaborator (file store, task service or
/// code sandbox).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport unreachable: connection refused, timeout, DNS, etc.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend answered but declined the request (bad path, name collision).
    #[error("rejected by remote: {message}")]
    Rejected { message: String },

    /// The path no longer exists on the remote side.
    #[error("not found: {path}")]
    NotFound { path: String },
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }
}

/// All errors that can arise while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.workbench/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
