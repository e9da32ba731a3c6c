//! Generation orchestration.
//!
//! Submits a generation, polls the operation on a fixed interval until it
//! reports done, then downloads the result and registers it for playback.
//! Polling is bounded by both an attempt count and a wall-clock deadline.
//! Any failure aborts the whole generation; no partial result is returned.

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use rns_genai::{GenAiError, GenerationRequest, ReferenceImage, VideoGenerator};
use rns_media::PlaybackRegistry;
use rns_models::{contains_placeholder, MediaAsset, PlaybackHandle};

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::progress::ProgressSender;

/// MIME type of generated videos.
pub const RESULT_MIME: &str = "video/mp4";

pub const SUBMIT_MESSAGE: &str = "Initializing advanced render engine...";
pub const POLL_MESSAGE: &str = "Cinematic frames are being processed";
pub const DOWNLOAD_MESSAGE: &str = "Downloading rendered video...";
pub const NO_URI_MESSAGE: &str = "Video generation failed - no URI returned.";

/// Poll message with a rotating one-to-three dot ellipsis.
pub fn poll_message(attempt: u32) -> String {
    let dots = ".".repeat((attempt as usize % 3) + 1);
    format!("{}{}", POLL_MESSAGE, dots)
}

/// Drives one generation from submission to playback handle.
pub struct GenerationOrchestrator {
    generator: Arc<dyn VideoGenerator>,
    registry: Arc<PlaybackRegistry>,
    config: StudioConfig,
}

impl GenerationOrchestrator {
    pub fn new(
        generator: Arc<dyn VideoGenerator>,
        registry: Arc<PlaybackRegistry>,
        config: StudioConfig,
    ) -> Self {
        Self {
            generator,
            registry,
            config,
        }
    }

    /// Generate a video for a finalized prompt.
    ///
    /// The prompt must not contain the placeholder token.
    pub async fn generate(
        &self,
        prompt: &str,
        reference: Option<&MediaAsset>,
        progress: ProgressSender,
    ) -> StudioResult<PlaybackHandle> {
        if contains_placeholder(prompt) {
            return Err(StudioError::generation(
                "Prompt still contains the subject placeholder",
            ));
        }

        let started = Instant::now();
        progress.submitted(SUBMIT_MESSAGE);

        let mut request = GenerationRequest::new(prompt);
        if let Some(asset) = reference {
            request = request.with_reference_image(ReferenceImage::from(asset));
        }

        let mut operation = self
            .generator
            .submit(&request)
            .await
            .map_err(StudioError::from_generation)?;

        let mut attempts = 0u32;
        while !operation.done {
            if attempts >= self.config.max_poll_attempts
                || started.elapsed() >= self.config.max_generation_time
            {
                return Err(StudioError::Timeout {
                    attempts,
                    elapsed: started.elapsed(),
                });
            }

            progress.polling(attempts + 1, poll_message(attempts));
            sleep(self.config.poll_interval).await;
            attempts += 1;

            debug!(operation = %operation.name, attempt = attempts, "Re-polling generation");
            operation = self
                .generator
                .poll(&operation)
                .await
                .map_err(StudioError::from_generation)?;
        }

        if let Some(error) = operation.error {
            return Err(StudioError::from_generation(GenAiError::OperationFailed {
                code: error.code,
                message: error.message,
            }));
        }

        let uri = operation
            .video_uri
            .ok_or_else(|| StudioError::generation(NO_URI_MESSAGE))?;

        progress.downloading(DOWNLOAD_MESSAGE);
        let bytes = self
            .generator
            .fetch(&uri)
            .await
            .map_err(StudioError::from_generation)?;

        let handle = self.registry.register(bytes, RESULT_MIME);
        progress.complete();

        info!(
            handle = %handle,
            polls = attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation finished"
        );
        Ok(handle)
    }
}
