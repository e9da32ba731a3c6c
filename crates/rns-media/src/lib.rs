//! Media intake and playback handle management.
//!
//! This crate provides:
//! - File intake into base64-encoded [`MediaAsset`]s
//! - MIME type detection from file extensions
//! - A registry that issues and revokes playback handles

pub mod error;
pub mod intake;
pub mod playback;

pub use error::{MediaError, MediaResult};
pub use intake::{guess_mime, ingest_bytes, ingest_file, DEFAULT_MIME};
pub use playback::{PlaybackMedia, PlaybackRegistry};

pub use rns_models::{MediaAsset, MediaKind, PlaybackHandle};
