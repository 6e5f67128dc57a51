//! Error types shared by the game and learning modules

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while saving or loading a network record
///
/// I/O problems and malformed content are kept apart so callers can tell a
/// missing checkpoint from a corrupt one.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The file could not be read or written
    #[error("model file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but does not hold a valid network record
    #[error("malformed model record in {path:?}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// An in-memory record whose matrices disagree with its layer sizes
    #[error("inconsistent model record: {0}")]
    InvalidRecord(String),
}

impl ModelError {
    /// True for missing/unreadable files, false for bad content
    pub fn is_io(&self) -> bool {
        matches!(self, ModelError::Io { .. })
    }

    /// Attach the file the record came from
    pub(crate) fn in_file(self, path: &Path) -> Self {
        match self {
            ModelError::InvalidRecord(reason) => ModelError::Format {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        }
    }
}

/// A configuration value outside its valid range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
