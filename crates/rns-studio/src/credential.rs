//! Credential gate.
//!
//! Generation is only attempted once a key is present. Selecting a key is a
//! user-driven step; headless runs pick it up from the environment.

use async_trait::async_trait;
use tracing::{info, warn};

use rns_genai::{key_from_env, ApiKeyStore};

use crate::error::{StudioError, StudioResult};

/// Source of the API credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether a credential is currently available.
    fn has_credential(&self) -> bool;

    /// Ask for a credential to be selected.
    async fn select_credential(&self) -> StudioResult<()>;
}

/// Credential provider backed by environment variables.
///
/// Selection re-reads `.env` and the process environment into the key store
/// shared with the remote clients.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    store: ApiKeyStore,
}

impl EnvCredentialProvider {
    pub fn new(store: ApiKeyStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ApiKeyStore {
        &self.store
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    fn has_credential(&self) -> bool {
        self.store.is_present()
    }

    async fn select_credential(&self) -> StudioResult<()> {
        dotenvy::dotenv().ok();

        match key_from_env() {
            Some(key) => {
                self.store.set(key);
                info!("API key selected from environment");
                Ok(())
            }
            None => {
                warn!("No API key found in environment");
                Err(StudioError::credential(
                    "No API key found; set GEMINI_API_KEY or API_KEY",
                ))
            }
        }
    }
}
