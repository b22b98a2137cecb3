use crate::application_port::{ApiKeyError, ApiKeyService};
use crate::domain_model::{ApiKey, Permission, TokenDigest};
use crate::domain_port::ApiKeyStore;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

pub const API_KEY_TTL_DAYS: i64 = 30;

pub struct RealApiKeyService {
    store: Arc<dyn ApiKeyStore>,
    ttl: Duration,
}

impl RealApiKeyService {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self {
            store,
            ttl: Duration::days(API_KEY_TTL_DAYS),
        }
    }

    fn new_raw_key() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    async fn save(&self, raw_key: &str, permissions: Vec<Permission>) -> Result<ApiKey, ApiKeyError> {
        let now = Utc::now();
        let key = ApiKey {
            digest: TokenDigest::of(raw_key),
            active: true,
            permissions,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.save(&key).await?;
        Ok(key)
    }
}

#[async_trait::async_trait]
impl ApiKeyService for RealApiKeyService {
    async fn check(&self, raw_key: &str, required: Permission) -> Result<ApiKey, ApiKeyError> {
        let raw_key = raw_key.trim();
        if raw_key.is_empty() {
            return Err(ApiKeyError::Missing);
        }

        let key = self
            .store
            .find_by_digest(&TokenDigest::of(raw_key))
            .await?
            .ok_or(ApiKeyError::Invalid)?;
        if !key.is_usable(Utc::now()) {
            debug!(digest = ?key.digest, "inactive or expired api key");
            return Err(ApiKeyError::Invalid);
        }
        if !key.allows(required) {
            return Err(ApiKeyError::PermissionDenied(required));
        }
        Ok(key)
    }

    async fn issue(&self, permissions: Vec<Permission>) -> Result<(String, ApiKey), ApiKeyError> {
        let raw_key = Self::new_raw_key();
        let key = self.save(&raw_key, permissions).await?;
        info!(digest = ?key.digest, "api key issued");
        Ok((raw_key, key))
    }

    async fn install(
        &self,
        raw_key: &str,
        permissions: Vec<Permission>,
    ) -> Result<ApiKey, ApiKeyError> {
        if raw_key.trim().is_empty() {
            return Err(ApiKeyError::Missing);
        }
        self.save(raw_key.trim(), permissions).await
    }
}
