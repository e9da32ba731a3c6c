//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use rns_models::PlaybackHandle;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media intake and playback.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to read {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Playback handle is not live: {0}")]
    HandleNotLive(PlaybackHandle),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a decode error for a file that could not be read.
    pub fn decode(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Check if the caller can recover by picking another file.
    pub fn is_decode(&self) -> bool {
        matches!(self, MediaError::Decode { .. })
    }
}
