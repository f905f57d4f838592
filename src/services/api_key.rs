use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{ApiKey, ApiKeyPatch, NewApiKey, Provider};
use crate::notify::Notifier;
use crate::store::RecordStore;

use super::EntityService;

const PROVIDER_FIELD: &str = "provider";

/// Share of simulated connection tests that succeed.
const CONNECTION_SUCCESS_RATE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

/// LLM provider keys, one per provider.
#[derive(Clone)]
pub struct ApiKeyService {
    keys: EntityService<ApiKey>,
    test_delay: Duration,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Notifier, test_delay: Duration) -> Self {
        Self {
            keys: EntityService::new(store, notifier),
            test_delay,
        }
    }

    pub async fn get_all(&self) -> Vec<ApiKey> {
        self.keys.get_all().await
    }

    pub async fn get_by_provider(&self, provider: Provider) -> Result<Option<ApiKey>> {
        Ok(self
            .keys
            .try_get_all()
            .await?
            .into_iter()
            .find(|k| k.provider == provider))
    }

    /// Store a key for `provider`, replacing the existing one in a single upsert.
    pub async fn try_create(&self, provider: Provider, key: &str) -> Result<ApiKey> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Validation(
                "Please select a provider and enter an API key".to_string(),
            ));
        }
        let draft = NewApiKey {
            provider,
            key: key.to_string(),
        };
        self.keys.try_upsert_by_key(PROVIDER_FIELD, &draft).await
    }

    pub async fn create(&self, provider: Provider, key: &str) -> Option<ApiKey> {
        let notifier = self.keys.notifier();
        match self.try_create(provider, key).await {
            Ok(saved) => {
                notifier.success(format!("{} API key saved", provider));
                Some(saved)
            }
            Err(e) => {
                tracing::error!(provider = provider.id(), "Error saving API key: {}", e);
                notifier.error("Failed to save API key");
                None
            }
        }
    }

    /// Turn the stored key for `provider` on or off without touching the secret.
    pub async fn set_active(&self, provider: Provider, active: bool) -> Option<ApiKey> {
        match self.get_by_provider(provider).await {
            Ok(Some(key)) => {
                let patch = ApiKeyPatch {
                    is_active: Some(active),
                    ..Default::default()
                };
                self.keys.update(key.id, &patch).await
            }
            Ok(None) => {
                self.keys.notifier().error("API key not found");
                None
            }
            Err(e) => {
                tracing::warn!(provider = provider.id(), "Error looking up API key: {}", e);
                self.keys.notifier().error("Failed to update API key");
                None
            }
        }
    }

    /// Remove the key for `provider`. `false` when there is none.
    pub async fn delete(&self, provider: Provider) -> bool {
        match self.get_by_provider(provider).await {
            Ok(Some(key)) => self.keys.delete(key.id).await,
            Ok(None) => {
                self.keys.notifier().error("API key not found");
                false
            }
            Err(e) => {
                tracing::warn!(provider = provider.id(), "Error looking up API key: {}", e);
                self.keys.notifier().error("Failed to remove API key");
                false
            }
        }
    }

    /// Simulated connection check: no request is made, and roughly four in
    /// five attempts succeed.
    pub async fn test_connection(&self, provider: Provider) -> Result<ConnectionTest> {
        if !self.test_delay.is_zero() {
            tokio::time::sleep(self.test_delay).await;
        }
        let roll: f64 = rand::thread_rng().gen();
        connection_outcome(provider, roll)
    }
}

fn connection_outcome(provider: Provider, roll: f64) -> Result<ConnectionTest> {
    if roll < CONNECTION_SUCCESS_RATE {
        Ok(ConnectionTest {
            success: true,
            message: "Connection successful".to_string(),
        })
    } else {
        Err(AppError::ConnectionFailed(provider.display_name().to_string()))
    }
}
