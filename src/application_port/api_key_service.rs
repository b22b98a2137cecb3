use crate::domain_model::{ApiKey, Permission};
use crate::domain_port::ApiKeyStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("api key missing")]
    Missing,
    #[error("api key invalid")]
    Invalid,
    #[error("api key lacks permission {0}")]
    PermissionDenied(Permission),
    #[error("store error: {0}")]
    Store(String),
}

impl From<ApiKeyStoreError> for ApiKeyError {
    fn from(err: ApiKeyStoreError) -> Self {
        ApiKeyError::Store(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait ApiKeyService: Send + Sync {
    /// Resolves a raw key and checks it grants `required`.
    async fn check(&self, raw_key: &str, required: Permission) -> Result<ApiKey, ApiKeyError>;
    /// Mints a new random key; the raw value is only ever returned here.
    async fn issue(&self, permissions: Vec<Permission>) -> Result<(String, ApiKey), ApiKeyError>;
    /// Installs a caller-chosen key, e.g. a bootstrap key from settings.
    async fn install(
        &self,
        raw_key: &str,
        permissions: Vec<Permission>,
    ) -> Result<ApiKey, ApiKeyError>;
}
