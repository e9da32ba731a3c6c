//! Studio error types.

use std::time::Duration;

use thiserror::Error;

use rns_genai::GenAiError;
use rns_media::MediaError;

pub type StudioResult<T> = Result<T, StudioError>;

/// Message shown when the service rejects the selected key.
pub const CREDENTIAL_MESSAGE: &str = "Invalid API key state. Please re-verify account access.";
/// Message shown when scene analysis fails for any reason.
pub const ANALYSIS_MESSAGE: &str = "Analysis failed. Please try again.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Could not read file: {0}")]
    Decode(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Generation timed out after {attempts} polls ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    #[error("Media error: {0}")]
    Media(MediaError),
}

impl StudioError {
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Classify a failure from the analysis service.
    pub fn from_analysis(err: GenAiError) -> Self {
        Self::Analysis(err.to_string())
    }

    /// Classify a failure from the generation service.
    ///
    /// Credential failures are split out so the workflow can ask for a new key.
    pub fn from_generation(err: GenAiError) -> Self {
        if err.is_credential_error() {
            Self::Credential(err.to_string())
        } else {
            Self::Generation(err.to_string())
        }
    }

    pub fn is_credential(&self) -> bool {
        matches!(self, StudioError::Credential(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StudioError::Timeout { .. })
    }

    /// Text for the status line.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::Analysis(_) => ANALYSIS_MESSAGE.to_string(),
            StudioError::Credential(_) => CREDENTIAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<MediaError> for StudioError {
    fn from(err: MediaError) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Media(err)
        }
    }
}
