use crate::domain_model::PrincipalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

impl RefreshToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> TokenDigest {
        TokenDigest::of(&self.0)
    }
}

/// Freshly issued access/refresh tokens. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims recovered from a token whose signature and expiry checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub principal_id: PrincipalId,
    pub handle: String,
    pub kind: TokenKind,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Lowercase hex SHA-256 of a secret. Stores keep digests, never the secret.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenDigest(pub String);

impl TokenDigest {
    pub fn of(secret: &str) -> Self {
        TokenDigest(hex::encode(Sha256::digest(secret.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // prefix is enough to correlate log lines
        let prefix: String = self.0.chars().take(12).collect();
        write!(f, "TokenDigest({prefix}..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_lowercase_hex() {
        let a = TokenDigest::of("header.payload.signature");
        let b = RefreshToken("header.payload.signature".to_string()).digest();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, TokenDigest::of("header.payload.signaturf"));
    }

    #[test]
    fn digest_debug_is_truncated() {
        let d = TokenDigest::of("x");
        let printed = format!("{:?}", d);
        assert!(printed.len() < 30);
    }

    #[test]
    fn debug_of_non_ascii_digest_does_not_split_a_char() {
        // stored digests come back from external stores unchecked
        let d = TokenDigest("ééééééééééééééé".to_string());
        assert_eq!(format!("{:?}", d), "TokenDigest(éééééééééééé..)");
    }
}
