//! Clients for the hosted generative models.
//!
//! This crate provides:
//! - [`GeminiAnalyzer`]: scene analysis of an inline video via `generateContent`
//! - [`VeoClient`]: long-running video generation via `predictLongRunning`
//! - The [`SceneAnalyzer`] and [`VideoGenerator`] traits the orchestrator is
//!   written against, so either service can be swapped or faked

pub mod analyzer;
pub mod config;
pub mod error;
pub mod generator;
mod http;
pub mod metrics;
pub mod types;

pub use analyzer::{GeminiAnalyzer, SceneAnalyzer, ANALYSIS_INSTRUCTION};
pub use config::{key_from_env, ApiKeyStore, GenAiConfig};
pub use error::{GenAiError, GenAiResult, ENTITY_NOT_FOUND};
pub use generator::{VeoClient, VideoGenerator};
pub use types::{GenerationRequest, Operation, OperationError, OutputConfig, ReferenceImage};
