use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Process-local [`SessionStore`]. Rotation runs under the shard write lock
/// of the principal's entry, which makes the compare-and-swap atomic.
pub struct MemorySessionStore {
    sessions: DashMap<PrincipalId, SessionRecord>,
    // hints only: every read and mutation re-checks the record itself
    session_index: DashMap<SessionId, PrincipalId>,
    used_index: DashMap<TokenDigest, PrincipalId>,
    ttl: chrono::Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        MemorySessionStore {
            sessions: DashMap::new(),
            session_index: DashMap::new(),
            used_index: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn find_live<F>(&self, pred: F) -> Option<SessionRecord>
    where
        F: Fn(&SessionRecord) -> bool,
    {
        let now = Utc::now();
        self.sessions
            .iter()
            .find(|entry| !entry.is_expired(now) && pred(entry.value()))
            .map(|entry| entry.value().clone())
    }

    fn forget_indexes(&self, record: &SessionRecord) {
        self.session_index.remove(&record.id);
        for digest in record.used_refresh_tokens.keys() {
            self.used_index
                .remove_if(digest, |_, owner| *owner == record.principal_id);
        }
    }

    /// Drops expired records. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut expired = Vec::new();
        self.sessions.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                expired.push(record.clone());
            }
            keep
        });
        for record in &expired {
            self.forget_indexes(record);
        }
        expired.len()
    }

    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let purged = self.purge_expired();
                    if purged > 0 {
                        debug!(purged, "expired sessions purged");
                    }
                }
            }
        }
        info!("session sweeper stopped");
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        principal_id: PrincipalId,
        key_pair: KeyPair,
        refresh_token: &TokenDigest,
    ) -> Result<SessionRecord, SessionStoreError> {
        let now = Utc::now();
        let record = SessionRecord {
            id: SessionId::new(),
            principal_id,
            key_pair,
            current_refresh_token: refresh_token.clone(),
            used_refresh_tokens: HashMap::new(),
            created_at: now,
            updated_at: now,
            expires_at: self.expiry_from(now),
        };

        self.session_index.insert(record.id, principal_id);
        if let Some(previous) = self.sessions.insert(principal_id, record.clone()) {
            self.forget_indexes(&previous);
        }
        Ok(record)
    }

    async fn find_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .get(&principal_id)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_current_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.find_live(|record| record.current_refresh_token == *refresh_token))
    }

    async fn find_by_used_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let Some(principal_id) = self
            .used_index
            .get(refresh_token)
            .map(|entry| *entry.value())
        else {
            return Ok(None);
        };
        let now = Utc::now();
        Ok(self
            .sessions
            .get(&principal_id)
            .filter(|entry| {
                !entry.is_expired(now) && entry.used_refresh_tokens.contains_key(refresh_token)
            })
            .map(|entry| entry.value().clone()))
    }

    async fn rotate(&self, rotation: SessionRotation) -> Result<RotateOutcome, SessionStoreError> {
        let Some(principal_id) = self
            .session_index
            .get(&rotation.session_id)
            .map(|entry| *entry.value())
        else {
            return Ok(RotateOutcome::Conflict);
        };
        let Some(mut record) = self.sessions.get_mut(&principal_id) else {
            return Ok(RotateOutcome::Conflict);
        };

        let now = Utc::now();
        if record.id != rotation.session_id
            || record.is_expired(now)
            || record.current_refresh_token != rotation.consumed_refresh_token
        {
            return Ok(RotateOutcome::Conflict);
        }

        record.key_pair = rotation.key_pair;
        self.used_index
            .insert(rotation.consumed_refresh_token.clone(), principal_id);
        record
            .used_refresh_tokens
            .insert(rotation.consumed_refresh_token, now);
        record.current_refresh_token = rotation.new_refresh_token;
        record.updated_at = now;
        record.expires_at = self.expiry_from(now);

        Ok(RotateOutcome::Rotated(record.clone()))
    }

    async fn revoke(&self, principal_id: PrincipalId) -> Result<bool, SessionStoreError> {
        match self.sessions.remove(&principal_id) {
            Some((_, record)) => {
                self.forget_indexes(&record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_by_record_id(&self, session_id: SessionId) -> Result<bool, SessionStoreError> {
        let Some((_, principal_id)) = self.session_index.remove(&session_id) else {
            return Ok(false);
        };
        match self
            .sessions
            .remove_if(&principal_id, |_, record| record.id == session_id)
        {
            Some((_, record)) => {
                self.forget_indexes(&record);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
