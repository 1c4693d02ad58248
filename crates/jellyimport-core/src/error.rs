use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A file or directory could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The run was interrupted through a cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// An external inspection tool could not be run
    #[error("Failed to probe {path}: {message}")]
    Probe { path: PathBuf, message: String },
}

impl ImportError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;
