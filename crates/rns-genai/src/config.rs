//! Client configuration.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{GenAiError, GenAiResult};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default multimodal model used for scene analysis.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-pro-preview";
/// Default video synthesis model.
pub const DEFAULT_GENERATION_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Shared, replaceable API key.
///
/// Clients read the key on every request, so a key selected after the
/// clients were built is picked up without rebuilding them.
#[derive(Clone, Default)]
pub struct ApiKeyStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl ApiKeyStore {
    pub fn new(key: Option<String>) -> Self {
        let store = Self::default();
        if let Some(key) = key {
            store.set(key);
        }
        store
    }

    /// Load the first non-empty key from the environment.
    pub fn from_env() -> Self {
        Self::new(key_from_env())
    }

    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Current key, or [`GenAiError::MissingCredential`].
    pub fn require(&self) -> GenAiResult<String> {
        self.get().ok_or(GenAiError::MissingCredential)
    }

    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = if key.trim().is_empty() { None } else { Some(key) };
    }

    pub fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_present() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeyStore").field("key", &state).finish()
    }
}

/// Read the API key from the environment.
pub fn key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| !key.trim().is_empty())
}

/// Configuration for the hosted model clients.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// API host, without a trailing slash
    pub base_url: String,
    /// Model used by the scene analyzer
    pub analysis_model: String,
    /// Model used by the video generator
    pub generation_model: String,
    /// Per-request timeout (polling is bounded separately)
    pub request_timeout: Duration,
    /// API key shared by both clients
    pub api_key: ApiKeyStore,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            request_timeout: Duration::from_secs(300), // inline video uploads are large
            api_key: ApiKeyStore::default(),
        }
    }
}

impl GenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("GEMINI_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            analysis_model: std::env::var("RNS_ANALYSIS_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string()),
            generation_model: std::env::var("RNS_GENERATION_MODEL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("RNS_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            api_key: ApiKeyStore::from_env(),
        }
    }

    /// Point the clients at another host (used for local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(self, key: impl Into<String>) -> Self {
        self.api_key.set(key);
        self
    }

    /// Build the shared HTTP client.
    pub(crate) fn http_client(&self) -> GenAiResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| GenAiError::config(format!("Failed to build HTTP client: {}", e)))
    }

    /// URL of a model method, e.g. `models/{model}:generateContent`.
    pub(crate) fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GenAiConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.generation_model, "veo-3.1-fast-generate-preview");
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert!(!config.api_key.is_present());
    }

    #[test]
    fn test_model_url() {
        let config = GenAiConfig::default().with_base_url("http://localhost:9000/");
        assert_eq!(
            config.model_url("gemini-3-pro-preview", "generateContent"),
            "http://localhost:9000/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[test]
    fn test_key_store_is_shared_between_clones() {
        let store = ApiKeyStore::default();
        let clone = store.clone();
        store.set("abc");
        assert_eq!(clone.get().as_deref(), Some("abc"));

        clone.clear();
        assert!(matches!(store.require(), Err(GenAiError::MissingCredential)));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let store = ApiKeyStore::new(Some("   ".to_string()));
        assert!(!store.is_present());
    }

    #[test]
    fn test_debug_hides_key() {
        let store = ApiKeyStore::new(Some("super-secret".to_string()));
        let debug = format!("{:?}", store);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<set>"));
    }
}
