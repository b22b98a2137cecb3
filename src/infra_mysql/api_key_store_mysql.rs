use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// Permissions are persisted as a comma separated list of codes.
pub struct MySqlApiKeyStore {
    pool: MySqlPool,
}

impl MySqlApiKeyStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlApiKeyStore { pool }
    }

    fn encode_permissions(permissions: &[Permission]) -> String {
        permissions
            .iter()
            .map(Permission::code)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn decode_permissions(raw: &str) -> Result<Vec<Permission>, ApiKeyStoreError> {
        raw.split(',')
            .filter(|code| !code.is_empty())
            .map(|code| code.parse::<Permission>().map_err(ApiKeyStoreError::Corrupt))
            .collect()
    }

    fn row_to_key(row: MySqlRow) -> Result<ApiKey, ApiKeyStoreError> {
        let digest: String = row
            .try_get("key_digest")
            .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;
        let active: bool = row
            .try_get("active")
            .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;
        let permissions: String = row
            .try_get("permissions")
            .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;

        Ok(ApiKey {
            digest: TokenDigest(digest),
            active,
            permissions: Self::decode_permissions(&permissions)?,
            created_at,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl ApiKeyStore for MySqlApiKeyStore {
    async fn save(&self, key: &ApiKey) -> Result<(), ApiKeyStoreError> {
        sqlx::query(
            r#"
INSERT INTO api_key (key_digest, active, permissions, created_at, expires_at)
VALUES (?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
  active = VALUES(active),
  permissions = VALUES(permissions),
  expires_at = VALUES(expires_at)
"#,
        )
        .bind(key.digest.as_str())
        .bind(key.active)
        .bind(Self::encode_permissions(&key.permissions))
        .bind(key.created_at)
        .bind(key.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;

        Ok(())
    }

    async fn find_by_digest(
        &self,
        digest: &TokenDigest,
    ) -> Result<Option<ApiKey>, ApiKeyStoreError> {
        let row = sqlx::query(
            r#"
SELECT key_digest, active, permissions, created_at, expires_at
FROM api_key
WHERE key_digest = ?
"#,
        )
        .bind(digest.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiKeyStoreError::Store(e.to_string()))?;

        row.map(Self::row_to_key).transpose()
    }
}
