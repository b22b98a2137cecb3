use crate::domain_model::{ApiKey, TokenDigest};
use crate::domain_port::{ApiKeyStore, ApiKeyStoreError};
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryApiKeyStore {
    keys: DashMap<TokenDigest, ApiKey>,
}

impl MemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn save(&self, key: &ApiKey) -> Result<(), ApiKeyStoreError> {
        self.keys.insert(key.digest.clone(), key.clone());
        Ok(())
    }

    async fn find_by_digest(
        &self,
        digest: &TokenDigest,
    ) -> Result<Option<ApiKey>, ApiKeyStoreError> {
        Ok(self.keys.get(digest).map(|entry| entry.value().clone()))
    }
}
