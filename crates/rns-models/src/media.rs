//! Media asset models.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which slot of the workflow an asset occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Reference footage that gets analyzed
    BaseVideo,
    /// Replacement subject image
    TargetImage,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::BaseVideo => "base_video",
            MediaKind::TargetImage => "target_image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-local reference to media bytes held for playback.
///
/// Handles are issued and revoked by a playback registry; the id itself
/// carries no ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybackHandle(Uuid);

impl PlaybackHandle {
    /// Generate a fresh handle id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for PlaybackHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback:{}", self.0)
    }
}

/// Base64 text form of a file, as sent inline to the hosted models.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    /// Encode raw bytes.
    pub fn encode(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    /// Wrap text that is already base64.
    pub fn from_base64(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Decode back to the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Payloads are routinely megabytes of text; keep them out of logs.
impl fmt::Debug for EncodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedPayload({} chars)", self.0.len())
    }
}

/// A user-selected file, read into memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Original file name
    pub name: String,
    /// Slot this asset fills
    pub kind: MediaKind,
    /// Size of the source file in bytes
    pub size_bytes: u64,
    /// Declared or guessed MIME type
    pub mime_type: String,
    /// Handle for rendering the bytes without re-reading the source
    pub playback: PlaybackHandle,
    /// Base64 text of the file bytes
    pub payload: EncodedPayload,
}
