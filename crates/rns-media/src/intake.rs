//! Media intake.
//!
//! Reads a user-selected file into memory, encodes it for inline transfer
//! and registers a playback handle for it. No content, codec or size checks
//! are made; anything readable is accepted.

use std::path::Path;

use tracing::{debug, info};

use rns_models::{EncodedPayload, MediaAsset, MediaKind};

use crate::error::{MediaError, MediaResult};
use crate::playback::PlaybackRegistry;

/// MIME type used when neither the caller nor the extension gives one.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Guess a MIME type from a file name's extension.
pub fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(DEFAULT_MIME)
        .to_string()
}

/// Read a file from disk into a [`MediaAsset`].
///
/// The returned asset owns a fresh playback handle in `registry`; the caller
/// must revoke it once the asset is superseded or discarded.
pub async fn ingest_file(
    path: impl AsRef<Path>,
    kind: MediaKind,
    declared_mime: Option<&str>,
    registry: &PlaybackRegistry,
) -> MediaResult<MediaAsset> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MediaError::decode(path, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mime_type = match declared_mime {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => guess_mime(&name),
    };

    info!(
        kind = %kind,
        name = %name,
        size_bytes = bytes.len(),
        mime_type = %mime_type,
        "Ingested media file"
    );

    Ok(ingest_bytes(name, kind, bytes, mime_type, registry))
}

/// Build a [`MediaAsset`] from bytes already in memory.
pub fn ingest_bytes(
    name: impl Into<String>,
    kind: MediaKind,
    bytes: Vec<u8>,
    mime_type: impl Into<String>,
    registry: &PlaybackRegistry,
) -> MediaAsset {
    let mime_type = mime_type.into();
    let payload = EncodedPayload::encode(&bytes);
    let size_bytes = bytes.len() as u64;
    let playback = registry.register(bytes, mime_type.clone());

    debug!(handle = %playback, encoded_len = payload.len(), "Encoded media payload");

    MediaAsset {
        name: name.into(),
        kind,
        size_bytes,
        mime_type,
        playback,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("clip.mp4"), "video/mp4");
        assert_eq!(guess_mime("car.png"), "image/png");
        assert_eq!(guess_mime("car.jpeg"), "image/jpeg");
        assert_eq!(guess_mime("notes"), DEFAULT_MIME);
    }

    #[tokio::test]
    async fn test_ingest_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
        std::fs::write(&path, &bytes).unwrap();

        let registry = PlaybackRegistry::new();
        let asset = ingest_file(&path, MediaKind::BaseVideo, None, &registry)
            .await
            .unwrap();

        assert_eq!(asset.name, "clip.mp4");
        assert_eq!(asset.size_bytes, 4099);
        assert_eq!(asset.mime_type, "video/mp4");
        assert!(asset.mime_type.starts_with("video/"));
        assert_eq!(asset.payload.decode().unwrap(), bytes);

        let media = registry.resolve(&asset.playback).unwrap();
        assert_eq!(&*media.bytes, bytes.as_slice());
    }

    #[tokio::test]
    async fn test_declared_mime_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        std::fs::write(&path, b"frames").unwrap();

        let registry = PlaybackRegistry::new();
        let asset = ingest_file(&path, MediaKind::BaseVideo, Some("video/webm"), &registry)
            .await
            .unwrap();

        assert_eq!(asset.mime_type, "video/webm");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PlaybackRegistry::new();

        let err = ingest_file(dir.path().join("missing.mp4"), MediaKind::BaseVideo, None, &registry)
            .await
            .unwrap_err();

        assert!(err.is_decode());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_empty_file_is_accepted() {
        let registry = PlaybackRegistry::new();
        let asset =
            ingest_bytes("empty.png", MediaKind::TargetImage, Vec::new(), "image/png", &registry);
        assert_eq!(asset.size_bytes, 0);
        assert!(asset.payload.is_empty());
        assert!(registry.is_live(&asset.playback));
    }
}
