use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("infra error: {0}")]
    Store(String),
    #[error("corrupt session record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub enum RotateOutcome {
    Rotated(SessionRecord),
    /// The record is gone or its current refresh token already moved on.
    Conflict,
}

/// Sole writer of [`SessionRecord`]s. One record per principal.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert by principal: replaces any prior record, used set starts empty.
    async fn create(
        &self,
        principal_id: PrincipalId,
        key_pair: KeyPair,
        refresh_token: &TokenDigest,
    ) -> Result<SessionRecord, SessionStoreError>;

    async fn find_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<SessionRecord>, SessionStoreError>;

    async fn find_by_current_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Replay query: the session whose used set contains `refresh_token`.
    async fn find_by_used_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Compare-and-swap on `current_refresh_token`; atomic per session.
    async fn rotate(&self, rotation: SessionRotation) -> Result<RotateOutcome, SessionStoreError>;

    /// Deletes the principal's record. Returns whether one existed.
    async fn revoke(&self, principal_id: PrincipalId) -> Result<bool, SessionStoreError>;

    /// Deletes the record only if it is still `session_id`.
    async fn remove_by_record_id(&self, session_id: SessionId) -> Result<bool, SessionStoreError>;
}
