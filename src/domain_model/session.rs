use crate::domain_model::{KeyPair, PrincipalId, TokenDigest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(SessionId)
    }
}

/// The one live session of a principal.
///
/// Every refresh token ever issued for this record is either
/// `current_refresh_token` or a key of `used_refresh_tokens`, never both.
/// Used tokens map to the instant their rotation committed.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub principal_id: PrincipalId,
    pub key_pair: KeyPair,
    pub current_refresh_token: TokenDigest,
    pub used_refresh_tokens: HashMap<TokenDigest, DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn consumed_at(&self, refresh_token: &TokenDigest) -> Option<DateTime<Utc>> {
        self.used_refresh_tokens.get(refresh_token).copied()
    }
}

/// Arguments of a compare-and-swap rotation: applied only while the record
/// `session_id` still has `consumed_refresh_token` as its current token.
#[derive(Debug, Clone)]
pub struct SessionRotation {
    pub session_id: SessionId,
    pub key_pair: KeyPair,
    pub new_refresh_token: TokenDigest,
    pub consumed_refresh_token: TokenDigest,
}
