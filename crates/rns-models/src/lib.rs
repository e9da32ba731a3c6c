//! Shared data models for RNS Studio.
//!
//! This crate provides Serde-serializable types for:
//! - Media assets and playback handles
//! - Scene analysis results returned by the hosted model
//! - Prompt template placeholder substitution
//! - Workflow status and step indicators

pub mod analysis;
pub mod media;
pub mod prompt;
pub mod status;

// Re-export common types
pub use analysis::{AnalysisParseError, AnalysisResult, ANALYSIS_FIELDS};
pub use media::{EncodedPayload, MediaAsset, MediaKind, PlaybackHandle};
pub use prompt::{
    contains_placeholder, display_prompt, finalize_prompt, DISPLAY_SUBJECT, PLACEHOLDER,
    REFERENCE_SUBJECT,
};
pub use status::{GenerationStatus, Stage, WorkflowStep};
