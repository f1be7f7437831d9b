use std::path::PathBuf;
use thiserror::Error;

/// Top-level error taxonomy (spec.md §7). Per-record I/O failures during
/// hashing/comparison stay as plain `io::Error` deep in the hot path (see
/// `digest.rs`, `bytecmp.rs`) and are only ever recorded on the offending
/// `FileRecord`, never propagated here — only configuration and fatal
/// errors abort the process.
#[derive(Debug, Error)]
pub enum FdfError {
    #[error("{0}")]
    Config(String),

    #[error("{path}: {source}")]
    Traversal { path: PathBuf, #[source] source: std::io::Error },

    #[error("{path}: {source}")]
    Fatal { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FdfError {
    pub fn config(msg: impl Into<String>) -> Self {
        FdfError::Config(msg.into())
    }

    pub fn fatal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FdfError::Fatal { path: path.into(), source }
    }

    pub fn traversal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FdfError::Traversal { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, FdfError>;
