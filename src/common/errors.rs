use std::path::PathBuf;

/// Typed errors for reclaim operations.
/// `anyhow` carries context at the scanner seam and in the CLI,
/// but these let the library be precise about what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum ReclaimError {
    /// Nothing meaningful can run without a home directory
    #[error("no readable home directory; cannot locate user data to scan")]
    NoHomeDirectory,

    /// File system operation failed
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The history journal could not be opened or written
    #[error("journal error at '{}': {source}", .path.display())]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is invalid
    #[error("config error in '{}': {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// A record could not be encoded for storage
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReclaimError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReclaimError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that should stop the caller outright
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReclaimError::NoHomeDirectory | ReclaimError::Config { .. }
        )
    }
}

pub type ReclaimResult<T> = std::result::Result<T, ReclaimError>;
