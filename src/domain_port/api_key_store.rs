use crate::domain_model::{ApiKey, TokenDigest};

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyStoreError {
    #[error("infra error: {0}")]
    Store(String),
    #[error("corrupt api key record: {0}")]
    Corrupt(String),
}

#[async_trait::async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn save(&self, key: &ApiKey) -> Result<(), ApiKeyStoreError>;
    async fn find_by_digest(&self, digest: &TokenDigest)
    -> Result<Option<ApiKey>, ApiKeyStoreError>;
}
