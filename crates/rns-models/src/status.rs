//! Workflow status and step indicator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing selected yet
    #[default]
    Idle,
    /// Scene analysis request in flight
    Analyzing,
    /// Analysis available, waiting for a target image and the go-ahead
    Configuring,
    /// Generation request submitted and being polled
    Generating,
    /// Result video available
    Completed,
    /// Last attempt failed
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Analyzing => "analyzing",
            Stage::Configuring => "configuring",
            Stage::Generating => "generating",
            Stage::Completed => "completed",
            Stage::Error => "error",
        }
    }

    /// Check if this is a terminal state for the current attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Error)
    }

    /// Check if a remote call is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Stage::Analyzing | Stage::Generating)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage plus the free-text message shown alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStatus {
    pub stage: Stage,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl GenerationStatus {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn idle() -> Self {
        Self::new(Stage::Idle, "")
    }

    pub fn analyzing(message: impl Into<String>) -> Self {
        Self::new(Stage::Analyzing, message)
    }

    pub fn configuring(message: impl Into<String>) -> Self {
        Self::new(Stage::Configuring, message)
    }

    pub fn generating(message: impl Into<String>) -> Self {
        Self::new(Stage::Generating, message)
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self::new(Stage::Completed, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Stage::Error, message)
    }

    /// Same stage, new message.
    pub fn with_message(&self, message: impl Into<String>) -> Self {
        Self::new(self.stage, message)
    }
}

impl Default for GenerationStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Which screen of the three-step flow is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    Upload,
    AnalyzeAndTarget,
    Generate,
}

impl WorkflowStep {
    pub fn index(&self) -> u8 {
        match self {
            WorkflowStep::Upload => 0,
            WorkflowStep::AnalyzeAndTarget => 1,
            WorkflowStep::Generate => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStep::Upload => "Upload Base",
            WorkflowStep::AnalyzeAndTarget => "Analyze & Target",
            WorkflowStep::Generate => "Generate",
        }
    }

    /// Step implied by a stage. Errors keep whatever step was showing.
    pub fn for_stage(stage: Stage, current: WorkflowStep) -> WorkflowStep {
        match stage {
            Stage::Idle => WorkflowStep::Upload,
            Stage::Analyzing | Stage::Configuring => WorkflowStep::AnalyzeAndTarget,
            Stage::Generating | Stage::Completed => WorkflowStep::Generate,
            Stage::Error => current,
        }
    }
}
