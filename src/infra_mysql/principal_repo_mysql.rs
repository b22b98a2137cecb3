use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlPrincipalRepo {
    pool: MySqlPool,
}

impl MySqlPrincipalRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlPrincipalRepo { pool }
    }

    #[inline]
    fn pid_as_bytes(id: &PrincipalId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn pid_from_bytes(id: &[u8]) -> Result<PrincipalId, AuthError> {
        Ok(PrincipalId(
            Uuid::from_slice(id).map_err(|e| AuthError::Store(e.to_string()))?,
        ))
    }

    fn row_to_principal(row: MySqlRow) -> Result<Principal, AuthError> {
        let id_bytes: Vec<u8> = row
            .try_get("principal_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let id = Self::pid_from_bytes(&id_bytes)?;

        let handle: String = row
            .try_get("handle")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let credential_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let is_active: bool = row
            .try_get("is_active")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(Principal {
            id,
            handle,
            name,
            credential_hash,
            is_active,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for MySqlPrincipalRepo {
    async fn create(
        &self,
        handle: &str,
        name: &str,
        credential_hash: &str,
    ) -> Result<Principal, AuthError> {
        let principal = Principal {
            id: PrincipalId::new(),
            handle: handle.to_string(),
            name: name.to_string(),
            credential_hash: credential_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
INSERT INTO principal (principal_id, handle, name, password_hash, is_active, created_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::pid_as_bytes(&principal.id))
        .bind(&principal.handle)
        .bind(&principal.name)
        .bind(&principal.credential_hash)
        .bind(principal.is_active)
        .bind(principal.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::HandleTaken
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(principal)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT principal_id, handle, name, password_hash, is_active, created_at
FROM principal
WHERE handle = ?
"#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row.map(Self::row_to_principal).transpose()
    }

    async fn find_by_id(&self, principal_id: PrincipalId) -> Result<Option<Principal>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT principal_id, handle, name, password_hash, is_active, created_at
FROM principal
WHERE principal_id = ?
"#,
        )
        .bind(Self::pid_as_bytes(&principal_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row.map(Self::row_to_principal).transpose()
    }
}
