//! Playback handle registry.
//!
//! Every handle the registry issues stays live until it is revoked, and can
//! be revoked exactly once. The registry is shared through an `Arc`, so
//! several workflows may hold handles from the same registry; each handle is
//! still owned by exactly one of them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use rns_models::PlaybackHandle;

use crate::error::{MediaError, MediaResult};

/// Bytes and type behind a live handle.
#[derive(Debug, Clone)]
pub struct PlaybackMedia {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl PlaybackMedia {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Issues, resolves and revokes playback handles.
#[derive(Debug, Default)]
pub struct PlaybackRegistry {
    entries: Mutex<HashMap<PlaybackHandle, PlaybackMedia>>,
}

impl PlaybackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PlaybackHandle, PlaybackMedia>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hold `bytes` for playback and return a new handle to them.
    pub fn register(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        mime_type: impl Into<String>,
    ) -> PlaybackHandle {
        let handle = PlaybackHandle::new();
        let media = PlaybackMedia {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        };
        debug!(handle = %handle, bytes = media.len(), "Registered playback handle");
        self.entries().insert(handle.clone(), media);
        handle
    }

    /// Look up a live handle.
    pub fn resolve(&self, handle: &PlaybackHandle) -> Option<PlaybackMedia> {
        self.entries().get(handle).cloned()
    }

    pub fn is_live(&self, handle: &PlaybackHandle) -> bool {
        self.entries().contains_key(handle)
    }

    /// Release a handle. Revoking a handle that is not live is an error.
    pub fn revoke(&self, handle: &PlaybackHandle) -> MediaResult<()> {
        match self.entries().remove(handle) {
            Some(media) => {
                debug!(handle = %handle, bytes = media.len(), "Revoked playback handle");
                Ok(())
            }
            None => {
                warn!(handle = %handle, "Attempted to revoke a handle that is not live");
                Err(MediaError::HandleNotLive(handle.clone()))
            }
        }
    }

    /// Number of handles currently live.
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    /// Write the media behind a live handle to `path`.
    pub async fn export(
        &self,
        handle: &PlaybackHandle,
        path: impl AsRef<Path>,
    ) -> MediaResult<u64> {
        let path = path.as_ref();
        let media = self
            .resolve(handle)
            .ok_or_else(|| MediaError::HandleNotLive(handle.clone()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(path, &media.bytes).await?;
        debug!(handle = %handle, path = %path.display(), "Exported playback media");
        Ok(media.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let registry = PlaybackRegistry::new();
        let handle = registry.register(vec![1u8, 2, 3], "video/mp4");

        let media = registry.resolve(&handle).unwrap();
        assert_eq!(&*media.bytes, &[1, 2, 3]);
        assert_eq!(media.mime_type, "video/mp4");
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_revoke_exactly_once() {
        let registry = PlaybackRegistry::new();
        let handle = registry.register(vec![0u8; 4], "image/png");

        assert!(registry.revoke(&handle).is_ok());
        assert!(!registry.is_live(&handle));
        assert!(matches!(
            registry.revoke(&handle),
            Err(MediaError::HandleNotLive(_))
        ));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_handles_are_independent() {
        let registry = PlaybackRegistry::new();
        let a = registry.register(vec![1u8], "video/mp4");
        let b = registry.register(vec![2u8], "video/mp4");

        registry.revoke(&a).unwrap();
        assert!(registry.is_live(&b));
        assert_eq!(&*registry.resolve(&b).unwrap().bytes, &[2]);
    }

    #[tokio::test]
    async fn test_export_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PlaybackRegistry::new();
        let handle = registry.register(b"mp4 bytes".to_vec(), "video/mp4");

        let path = dir.path().join("out/result.mp4");
        let written = registry.export(&handle, &path).await.unwrap();

        assert_eq!(written, 9);
        assert_eq!(std::fs::read(&path).unwrap(), b"mp4 bytes");
    }

    #[tokio::test]
    async fn test_export_revoked_handle_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PlaybackRegistry::new();
        let handle = registry.register(vec![1u8], "video/mp4");
        registry.revoke(&handle).unwrap();

        let result = registry.export(&handle, dir.path().join("x.mp4")).await;
        tokio_test::assert_err!(result);
    }
}
