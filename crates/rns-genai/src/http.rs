//! Shared response handling.

use std::time::Instant;

use reqwest::Response;
use tracing::warn;

use crate::error::{GenAiError, GenAiResult};
use crate::metrics;
use crate::types::ApiErrorEnvelope;

/// Record metrics for a response and turn non-2xx statuses into errors.
///
/// The service's own error message is preferred over the raw body.
pub(crate) async fn check(
    operation: &'static str,
    started: Instant,
    response: Response,
) -> GenAiResult<Response> {
    let status = response.status();
    metrics::record_request(operation, status.as_u16(), started);

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(body);

    warn!(operation, status = status.as_u16(), "Remote call failed: {}", message);

    Err(GenAiError::RequestFailed {
        status: status.as_u16(),
        message,
    })
}
