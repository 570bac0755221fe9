use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by byte stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The folder a store writes into does not exist.
    #[error("folder does not exist: {}", .0.display())]
    MissingFolder(PathBuf),

    /// The store path has no file name component.
    #[error("empty storage file name: {}", .0.display())]
    EmptyFileName(PathBuf),

    /// A multi-file pattern is malformed.
    #[error("invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Underlying file system failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
