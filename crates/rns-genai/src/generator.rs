//! Video generation client.
//!
//! Generation is a long-running operation: `submit` starts it, `poll`
//! refreshes its status, and `fetch` downloads the finished video. The
//! polling loop itself lives with the caller.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::http;
use crate::metrics;
use crate::types::{GenerationRequest, Operation, OperationResponse, PredictRequest};

/// Hosted video synthesis service.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Start a generation and return its operation handle.
    async fn submit(&self, request: &GenerationRequest) -> GenAiResult<Operation>;

    /// Re-query the status of an operation.
    async fn poll(&self, operation: &Operation) -> GenAiResult<Operation>;

    /// Download the bytes at a result location.
    async fn fetch(&self, uri: &str) -> GenAiResult<Vec<u8>>;
}

/// Veo `predictLongRunning` client.
pub struct VeoClient {
    http: Client,
    config: GenAiConfig,
}

impl VeoClient {
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env())
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url, name.trim_start_matches('/'))
    }

    async fn read_operation(response: reqwest::Response) -> GenAiResult<Operation> {
        let wire: OperationResponse = response.json().await?;
        Ok(Operation::from(wire))
    }
}

/// Append the access key to a result location.
pub fn with_key(uri: &str, key: &str) -> GenAiResult<Url> {
    let mut url = Url::parse(uri)?;
    url.query_pairs_mut().append_pair("key", key);
    Ok(url)
}

#[async_trait]
impl VideoGenerator for VeoClient {
    async fn submit(&self, request: &GenerationRequest) -> GenAiResult<Operation> {
        let key = self.config.api_key.require()?;
        let model = &self.config.generation_model;
        let url = self.config.model_url(model, "predictLongRunning");

        info!(
            model = %model,
            has_reference = request.reference_image.is_some(),
            resolution = %request.output.resolution,
            aspect_ratio = %request.output.aspect_ratio,
            "Submitting video generation"
        );

        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .query(&[("key", key.as_str())])
            .json(&PredictRequest::from(request))
            .send()
            .await?;
        let response = http::check("generate_submit", started, response).await?;

        let operation = Self::read_operation(response).await?;
        if operation.name.is_empty() {
            return Err(GenAiError::invalid_response("Operation has no name"));
        }

        info!(operation = %operation.name, "Generation operation started");
        Ok(operation)
    }

    async fn poll(&self, operation: &Operation) -> GenAiResult<Operation> {
        let key = self.config.api_key.require()?;
        let url = self.operation_url(&operation.name);

        let started = Instant::now();
        let response = self
            .http
            .get(&url)
            .query(&[("key", key.as_str())])
            .send()
            .await?;
        let response = http::check("generate_poll", started, response).await?;

        let refreshed = Self::read_operation(response).await?;
        metrics::record_poll(refreshed.done);
        debug!(operation = %refreshed.name, done = refreshed.done, "Polled generation operation");

        Ok(refreshed)
    }

    async fn fetch(&self, uri: &str) -> GenAiResult<Vec<u8>> {
        let key = self.config.api_key.require()?;
        let url = with_key(uri, &key)?;

        let started = Instant::now();
        let response = self.http.get(url).send().await?;
        let response = http::check("generate_fetch", started, response).await?;

        let bytes = response.bytes().await?;
        info!(bytes = bytes.len(), "Downloaded generated video");
        Ok(bytes.to_vec())
    }
}
