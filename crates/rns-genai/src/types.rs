//! Request/response types for the hosted models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rns_models::{EncodedPayload, MediaAsset};

// =============================================================================
// Public request/result types
// =============================================================================

/// Fixed output settings for a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Number of videos to produce
    pub sample_count: u32,
    /// Output resolution (e.g. "720p")
    pub resolution: String,
    /// Output aspect ratio (e.g. "16:9")
    pub aspect_ratio: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_count: 1,
            resolution: "720p".to_string(),
            aspect_ratio: "16:9".to_string(),
        }
    }
}

/// Subject image the generated video should feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub payload: EncodedPayload,
    pub mime_type: String,
}

impl From<&MediaAsset> for ReferenceImage {
    fn from(asset: &MediaAsset) -> Self {
        Self {
            payload: asset.payload.clone(),
            mime_type: asset.mime_type.clone(),
        }
    }
}

/// A video generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Final prompt, placeholder already substituted
    pub prompt: String,
    pub reference_image: Option<ReferenceImage>,
    pub output: OutputConfig,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_image: None,
            output: OutputConfig::default(),
        }
    }

    pub fn with_reference_image(mut self, image: impl Into<ReferenceImage>) -> Self {
        self.reference_image = Some(image.into());
        self
    }
}

/// Error reported by a finished long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Snapshot of a long-running generation operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Resource name used to poll the operation
    pub name: String,
    pub done: bool,
    /// Location of the first generated video, once done
    pub video_uri: Option<String>,
    pub error: Option<OperationError>,
}

impl Operation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            video_uri: None,
            error: None,
        }
    }

    pub fn finished(name: impl Into<String>, video_uri: Option<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            video_uri,
            error: None,
        }
    }
}

// =============================================================================
// generateContent wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// =============================================================================
// predictLongRunning wire types
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: OutputConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictInstance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PredictImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredictImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

impl From<&GenerationRequest> for PredictRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
                image: request.reference_image.as_ref().map(|image| PredictImage {
                    bytes_base64_encoded: image.payload.as_str().to_string(),
                    mime_type: image.mime_type.clone(),
                }),
            }],
            parameters: request.output.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationResponse {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<PredictResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredictResponse {
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedSample {
    pub video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoRef {
    pub uri: Option<String>,
}

impl From<OperationResponse> for Operation {
    fn from(wire: OperationResponse) -> Self {
        let video_uri = wire
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri)
            .filter(|uri| !uri.is_empty());

        Self {
            name: wire.name,
            done: wire.done,
            video_uri,
            error: wire.error,
        }
    }
}

// =============================================================================
// Error envelope
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
