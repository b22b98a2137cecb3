use crate::application_port::{TokenCodec, TokenError};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub leeway_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String, // principal id
    email: String,
    typ: TokenKind,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // keeps same-second tokens distinct
}

fn encode_token(
    kind: TokenKind,
    claims: &PrincipalClaims,
    private_key: &PrivateKey,
    issued_at: DateTime<Utc>,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), TokenError> {
    let ttl = match kind {
        TokenKind::Access => cfg.access_ttl,
        TokenKind::Refresh => cfg.refresh_ttl,
    };
    let exp_dt = issued_at + ttl;
    let wire = WireClaims {
        sub: claims.principal_id.to_string(),
        email: claims.handle.clone(),
        typ: kind,
        exp: exp_dt.timestamp(),
        iat: issued_at.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let der = private_key.to_pkcs8_v1_der();
    let token = encode(
        &Header::new(Algorithm::EdDSA),
        &wire,
        &EncodingKey::from_ed_der(&der),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_token(
    kind: TokenKind,
    token: &str,
    public_key: &PublicKey,
    cfg: &JwtConfig,
) -> Result<Claims, TokenError> {
    let mut v = Validation::new(Algorithm::EdDSA);
    v.validate_exp = true;
    v.leeway = cfg.leeway_secs;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    v.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);

    let data = decode::<WireClaims>(token, &DecodingKey::from_ed_der(public_key.as_bytes()), &v)
        .map_err(|e| {
            debug!(error = %e, "token rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::ImmatureSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;
    let wire = data.claims;

    if wire.typ != kind {
        return Err(TokenError::WrongKind);
    }
    let principal_id = wire
        .sub
        .parse::<PrincipalId>()
        .map_err(|_| TokenError::Malformed)?;
    let issued_at = DateTime::from_timestamp(wire.iat, 0).ok_or(TokenError::Malformed)?;
    let expires_at = DateTime::from_timestamp(wire.exp, 0).ok_or(TokenError::Malformed)?;

    Ok(Claims {
        principal_id,
        handle: wire.email,
        kind: wire.typ,
        token_id: wire.jti,
        issued_at,
        expires_at,
    })
}

/// Signs with the principal's own Ed25519 key; verifiable by public key alone.
pub struct JwtEdDsaCodec {
    cfg: JwtConfig,
}

impl JwtEdDsaCodec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtEdDsaCodec { cfg }
    }

    fn issue_at(
        &self,
        claims: &PrincipalClaims,
        key_pair: &KeyPair,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let private_key = key_pair.private_key();
        let (access, access_exp) =
            encode_token(TokenKind::Access, claims, private_key, issued_at, &self.cfg)?;
        let (refresh, refresh_exp) =
            encode_token(TokenKind::Refresh, claims, private_key, issued_at, &self.cfg)?;
        Ok(TokenPair {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtEdDsaCodec {
    async fn issue(
        &self,
        claims: &PrincipalClaims,
        key_pair: &KeyPair,
    ) -> Result<TokenPair, TokenError> {
        // two signatures per call; kept off the reactor like key generation
        let codec = JwtEdDsaCodec::new(self.cfg.clone());
        let claims = claims.clone();
        let key_pair = key_pair.clone();
        tokio::task::spawn_blocking(move || codec.issue_at(&claims, &key_pair, Utc::now()))
            .await
            .map_err(|e| TokenError::Signing(e.to_string()))?
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
        public_key: &PublicKey,
    ) -> Result<Claims, TokenError> {
        decode_token(TokenKind::Access, token.as_str(), public_key, &self.cfg)
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
        public_key: &PublicKey,
    ) -> Result<Claims, TokenError> {
        decode_token(TokenKind::Refresh, token.as_str(), public_key, &self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtEdDsaCodec {
        JwtEdDsaCodec::new(JwtConfig {
            issuer: "shop-access.test".to_string(),
            audience: "shop-client".to_string(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            leeway_secs: 0,
        })
    }

    fn alice() -> PrincipalClaims {
        PrincipalClaims {
            principal_id: PrincipalId::new(),
            handle: "alice@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn issued_tokens_verify_with_matching_public_key() {
        let codec = codec();
        let keys = KeyPair::generate();
        let claims = alice();

        let pair = codec.issue(&claims, &keys).await.unwrap();
        let access = codec
            .verify_access_token(&pair.access_token, keys.public_key())
            .await
            .unwrap();
        assert_eq!(access.principal_id, claims.principal_id);
        assert_eq!(access.handle, claims.handle);
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(
            access.expires_at.timestamp(),
            pair.access_token_expires_at.timestamp()
        );

        let refresh = codec
            .verify_refresh_token(&pair.refresh_token, keys.public_key())
            .await
            .unwrap();
        assert_eq!(refresh.principal_id, claims.principal_id);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert!(pair.refresh_token_expires_at > pair.access_token_expires_at);
    }

    #[tokio::test]
    async fn access_token_past_its_horizon_is_expired() {
        let codec = codec();
        let keys = KeyPair::generate();
        let two_hours_ago = Utc::now() - chrono::Duration::hours(2);

        let pair = codec.issue_at(&alice(), &keys, two_hours_ago).unwrap();
        let err = codec
            .verify_access_token(&pair.access_token, keys.public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired));

        // refresh horizon is days, so the same pair's refresh token still verifies
        codec
            .verify_refresh_token(&pair.refresh_token, keys.public_key())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn foreign_public_key_is_invalid_signature() {
        let codec = codec();
        let keys = KeyPair::generate();
        let other = KeyPair::generate();

        let pair = codec.issue(&alice(), &keys).await.unwrap();
        let err = codec
            .verify_access_token(&pair.access_token, other.public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[tokio::test]
    async fn tokens_are_not_interchangeable() {
        let codec = codec();
        let keys = KeyPair::generate();
        let pair = codec.issue(&alice(), &keys).await.unwrap();

        let as_refresh = RefreshToken(pair.access_token.0.clone());
        let err = codec
            .verify_refresh_token(&as_refresh, keys.public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::WrongKind));

        let as_access = AccessToken(pair.refresh_token.0.clone());
        let err = codec
            .verify_access_token(&as_access, keys.public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::WrongKind));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let codec = codec();
        let keys = KeyPair::generate();
        let err = codec
            .verify_access_token(&AccessToken("not-a-jwt".to_string()), keys.public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Malformed));
    }

    #[tokio::test]
    async fn other_issuer_is_rejected() {
        let keys = KeyPair::generate();
        let pair = codec().issue(&alice(), &keys).await.unwrap();

        let mut cfg = codec().cfg;
        cfg.issuer = "someone-else".to_string();
        let strict = JwtEdDsaCodec::new(cfg);
        let err = strict
            .verify_access_token(&pair.access_token, keys.public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[tokio::test]
    async fn repeated_issue_never_repeats_a_token() {
        let codec = codec();
        let keys = KeyPair::generate();
        let claims = alice();

        let first = codec.issue(&claims, &keys).await.unwrap();
        let second = codec.issue(&claims, &keys).await.unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }
}
