//! Scene analysis client.
//!
//! Sends the whole video inline together with a fixed instruction and a
//! strict response schema, then validates that all six fields came back.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use rns_models::{AnalysisResult, EncodedPayload, ANALYSIS_FIELDS};

use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::http;
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};

/// Instruction sent with every video.
pub const ANALYSIS_INSTRUCTION: &str = r#"Analyze this video carefully. Identify:
1. The environment (e.g., snowy Antarctic tundra).
2. Main subjects (e.g., penguins, car).
3. Lighting conditions.
4. Cinematic techniques used (e.g., close-ups, wide shots, shallow depth of field).
5. Details of the car currently in the video.

Then, create a "Template Prompt" where the car description is a placeholder like [TARGET_CAR]. The prompt should describe the entire scene but use that placeholder.

Return the result in JSON format."#;

/// Describes the scene in a video.
#[async_trait]
pub trait SceneAnalyzer: Send + Sync {
    /// Analyze a base64 video payload. Single shot, no retries.
    async fn analyze(
        &self,
        payload: &EncodedPayload,
        mime_type: &str,
    ) -> GenAiResult<AnalysisResult>;
}

/// Response schema: six required string properties.
pub fn response_schema() -> Value {
    let properties: serde_json::Map<String, Value> = ANALYSIS_FIELDS
        .iter()
        .map(|name| (name.to_string(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": ANALYSIS_FIELDS,
    })
}

/// Gemini `generateContent` scene analyzer.
pub struct GeminiAnalyzer {
    http: Client,
    config: GenAiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env())
    }

    fn build_request(payload: &EncodedPayload, mime_type: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: payload.as_str().to_string(),
                        },
                    },
                    Part::Text {
                        text: ANALYSIS_INSTRUCTION.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }
}

#[async_trait]
impl SceneAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        payload: &EncodedPayload,
        mime_type: &str,
    ) -> GenAiResult<AnalysisResult> {
        let key = self.config.api_key.require()?;
        let model = &self.config.analysis_model;
        let url = self.config.model_url(model, "generateContent");

        info!(
            model = %model,
            mime_type,
            payload_chars = payload.len(),
            "Requesting scene analysis"
        );

        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .query(&[("key", key.as_str())])
            .json(&Self::build_request(payload, mime_type))
            .send()
            .await?;
        let response = http::check("analyze", started, response).await?;

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .text()
            .ok_or_else(|| GenAiError::invalid_response("No content in analysis response"))?;

        debug!(chars = text.len(), "Received analysis text");

        let result = AnalysisResult::from_json(&text).map_err(|e| {
            warn!("Rejected analysis response: {}", e);
            GenAiError::from(e)
        })?;

        info!(
            environment = %result.environment,
            original = %result.original_car,
            "Scene analysis complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_schema_requires_all_fields() {
        let schema = response_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["required"].as_array().unwrap().len(), 6);
        for name in ANALYSIS_FIELDS {
            assert_eq!(schema["properties"][name]["type"], "STRING");
        }
    }

    #[test]
    fn test_request_carries_video_then_instruction() {
        let request = GeminiAnalyzer::build_request(&EncodedPayload::encode(b"mp4"), "video/mp4");
        let wire = serde_json::to_value(&request).unwrap();
        let parts = &wire["contents"][0]["parts"];

        assert_eq!(parts[0]["inlineData"]["mimeType"], "video/mp4");
        assert_eq!(parts[0]["inlineData"]["data"], "bXA0");
        assert!(parts[1]["text"].as_str().unwrap().contains("[TARGET_CAR]"));
        assert_eq!(wire["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let config = GenAiConfig::default().with_base_url("http://127.0.0.1:9");
        let analyzer = GeminiAnalyzer::new(config).unwrap();
        let err = analyzer
            .analyze(&EncodedPayload::encode(b"x"), "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::MissingCredential));
    }
}
