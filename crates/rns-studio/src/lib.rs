//! Subject-swap video workflow.
//!
//! This crate provides:
//! - The workflow state machine as a pure transition function
//! - A generation orchestrator that submits, polls and downloads results
//! - The [`Studio`] driver that wires both to the remote clients
//! - Credential gating and structured workflow logging

pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod studio;
pub mod workflow;

pub use config::StudioConfig;
pub use credential::{CredentialProvider, EnvCredentialProvider};
pub use error::{StudioError, StudioResult};
pub use logging::WorkflowLogger;
pub use orchestrator::GenerationOrchestrator;
pub use progress::{ProgressEvent, ProgressSender};
pub use studio::{Studio, StudioCommand};
pub use workflow::{transition, Effect, TaskId, Transition, WorkflowEvent, WorkflowState};
