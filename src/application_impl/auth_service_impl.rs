use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 256;

pub struct RealAuthService {
    principal_repo: Arc<dyn PrincipalRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    key_generator: Arc<dyn KeyMaterialGenerator>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
}

impl RealAuthService {
    pub fn new(
        principal_repo: Arc<dyn PrincipalRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        key_generator: Arc<dyn KeyMaterialGenerator>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            principal_repo,
            credential_hasher,
            key_generator,
            token_codec,
            session_store,
        }
    }

    fn validate_register(handle: &str, name: &str, password: &str) -> Result<(), AuthError> {
        if !is_valid_handle(handle) {
            return Err(AuthError::InvalidInput("handle must be an email".to_string()));
        }
        if name.trim().is_empty() {
            return Err(AuthError::InvalidInput("name must not be empty".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput("password too short".to_string()));
        }
        if password.len() > MAX_PASSWORD_LEN {
            return Err(AuthError::InvalidInput("password too long".to_string()));
        }
        Ok(())
    }

    /// Fresh key pair, first token pair, and a session record replacing any
    /// earlier one for this principal.
    async fn open_session(&self, principal: &Principal) -> Result<AuthOutcome, AuthError> {
        let key_pair = self.key_generator.generate().await?;
        let tokens = self.token_codec.issue(&principal.claims(), &key_pair).await?;

        let record = self
            .session_store
            .create(principal.id, key_pair, &tokens.refresh_token.digest())
            .await?;
        info!(principal_id = %principal.id, session_id = %record.id, "session opened");

        Ok(AuthOutcome {
            principal: principal.summary(),
            session_id: record.id,
            tokens,
        })
    }

    /// Revocation after a proven replay. Failure is logged, never raised, so
    /// the compromise signal always reaches the caller.
    async fn revoke_compromised(&self, record: &SessionRecord) {
        warn!(
            principal_id = %record.principal_id,
            session_id = %record.id,
            "refresh token replay detected, revoking session"
        );
        match self.session_store.revoke(record.principal_id).await {
            Ok(_) => {}
            Err(e) => error!(
                principal_id = %record.principal_id,
                error = %e,
                "revocation after replay failed"
            ),
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<AuthOutcome, AuthError> {
        let RegisterInput {
            handle,
            name,
            password,
        } = request;
        let handle = normalize_handle(&handle);

        Self::validate_register(&handle, &name, &password)?;

        if self.principal_repo.find_by_handle(&handle).await?.is_some() {
            return Err(AuthError::HandleTaken);
        }

        let credential_hash = self.credential_hasher.hash_password(&password).await?;
        let principal = self
            .principal_repo
            .create(&handle, name.trim(), &credential_hash)
            .await?;

        self.open_session(&principal).await
    }

    async fn login(&self, request: LoginInput) -> Result<AuthOutcome, AuthError> {
        let LoginInput { handle, password } = request;
        let handle = normalize_handle(&handle);

        let principal = self
            .principal_repo
            .find_by_handle(&handle)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !principal.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &principal.credential_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(&principal).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        claimed: PrincipalId,
    ) -> Result<AuthOutcome, AuthError> {
        let started_at = Utc::now();
        let presented = RefreshToken(refresh_token.to_string());
        let digest = presented.digest();

        // 1. a token consumed before this request began is proof of theft;
        //    one consumed since then was taken by a concurrent refresh
        if let Some(owner) = self
            .session_store
            .find_by_used_refresh_token(&digest)
            .await?
        {
            if owner.consumed_at(&digest).is_some_and(|at| at >= started_at) {
                debug!(
                    principal_id = %owner.principal_id,
                    session_id = %owner.id,
                    "refresh token consumed by a concurrent request"
                );
                return Err(AuthError::Unauthenticated);
            }
            self.revoke_compromised(&owner).await;
            return Err(AuthError::SessionCompromised);
        }

        // 2. must be the claimed session's current token
        let record = self
            .session_store
            .find_by_principal(claimed)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        if record.current_refresh_token != digest {
            debug!(principal_id = %claimed, "stale or unknown refresh token");
            return Err(AuthError::Unauthenticated);
        }

        // 3. signature and expiry against the session's key
        let claims = self
            .token_codec
            .verify_refresh_token(&presented, record.key_pair.public_key())
            .await?;
        if claims.principal_id != claimed {
            return Err(AuthError::Unauthenticated);
        }

        let principal = self
            .principal_repo
            .find_by_id(claimed)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AuthError::Unauthenticated)?;

        // 4. issue with the existing key pair, then compare-and-swap
        let tokens = self
            .token_codec
            .issue(&principal.claims(), &record.key_pair)
            .await?;
        let rotation = SessionRotation {
            session_id: record.id,
            key_pair: record.key_pair.clone(),
            new_refresh_token: tokens.refresh_token.digest(),
            consumed_refresh_token: digest,
        };

        match self.session_store.rotate(rotation).await? {
            RotateOutcome::Rotated(rotated) => {
                debug!(principal_id = %claimed, session_id = %rotated.id, "refresh token rotated");
                Ok(AuthOutcome {
                    principal: principal.summary(),
                    session_id: rotated.id,
                    tokens,
                })
            }
            RotateOutcome::Conflict => {
                warn!(principal_id = %claimed, session_id = %record.id, "lost refresh rotation race");
                Err(AuthError::Unauthenticated)
            }
        }
    }

    async fn logout(&self, session_id: SessionId) -> Result<(), AuthError> {
        let removed = self.session_store.remove_by_record_id(session_id).await?;
        info!(session_id = %session_id, removed, "logout");
        Ok(())
    }

    async fn authenticate(
        &self,
        access_token: &str,
        claimed: PrincipalId,
    ) -> Result<AuthContext, AuthError> {
        let record = self
            .session_store
            .find_by_principal(claimed)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let claims = self
            .token_codec
            .verify_access_token(&AccessToken(access_token.to_string()), record.key_pair.public_key())
            .await?;
        if claims.principal_id != claimed {
            return Err(AuthError::Unauthenticated);
        }

        self.principal_repo
            .find_by_id(claimed)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AuthError::Unauthenticated)?;

        Ok(AuthContext {
            session_id: record.id,
            claims,
        })
    }
}
