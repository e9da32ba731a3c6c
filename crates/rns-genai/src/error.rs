//! Remote model client error types.

use thiserror::Error;

use rns_models::AnalysisParseError;

pub type GenAiResult<T> = Result<T, GenAiError>;

/// Failure text the service returns when the selected key cannot see the model.
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No API key selected")]
    MissingCredential,

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Analysis rejected: {0}")]
    Analysis(#[from] AnalysisParseError),

    #[error("Operation failed: {message}")]
    OperationFailed { code: Option<i64>, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GenAiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if the service reported that the credential cannot reach the model.
    ///
    /// This signals a broken key selection rather than a failed job.
    pub fn is_entity_not_found(&self) -> bool {
        self.to_string()
            .to_lowercase()
            .contains(&ENTITY_NOT_FOUND.to_lowercase())
    }

    /// Check if the failure is about the credential rather than the request.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, GenAiError::MissingCredential) || self.is_entity_not_found()
    }
}
