use crate::application_port::*;
use crate::domain_model::*;
use chrono::{Duration, Utc};

const FAKE_ACCESS_PREFIX: &str = "fake-access-token:";
const FAKE_REFRESH_PREFIX: &str = "fake-refresh-token:";

/// Deterministic stand-in for local front-end work. Accepts any password and
/// never detects replay.
#[derive(Debug, Default)]
pub struct FakeAuthService;

impl FakeAuthService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AuthService for FakeAuthService {
    async fn register(&self, request: RegisterInput) -> Result<AuthOutcome, AuthError> {
        let handle = normalize_handle(&request.handle);
        if !is_valid_handle(&handle) {
            return Err(AuthError::InvalidInput("handle must be an email".to_string()));
        }
        Ok(fake_outcome(&handle, &request.name))
    }

    async fn login(&self, request: LoginInput) -> Result<AuthOutcome, AuthError> {
        let handle = normalize_handle(&request.handle);
        Ok(fake_outcome(&handle, &handle))
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        claimed: PrincipalId,
    ) -> Result<AuthOutcome, AuthError> {
        match refresh_token.strip_prefix(FAKE_REFRESH_PREFIX) {
            Some(handle) if fake_id(handle) == claimed => Ok(fake_outcome(handle, handle)),
            _ => Err(AuthError::Unauthenticated),
        }
    }

    async fn logout(&self, _session_id: SessionId) -> Result<(), AuthError> {
        Ok(())
    }

    async fn authenticate(
        &self,
        access_token: &str,
        claimed: PrincipalId,
    ) -> Result<AuthContext, AuthError> {
        match access_token.strip_prefix(FAKE_ACCESS_PREFIX) {
            Some(handle) if fake_id(handle) == claimed => {
                let now = Utc::now();
                Ok(AuthContext {
                    session_id: fake_session_id(handle),
                    claims: Claims {
                        principal_id: claimed,
                        handle: handle.to_string(),
                        kind: TokenKind::Access,
                        token_id: "fake".to_string(),
                        issued_at: now,
                        expires_at: now + Duration::days(1),
                    },
                })
            }
            _ => Err(AuthError::Unauthenticated),
        }
    }
}

fn fake_id(handle: &str) -> PrincipalId {
    PrincipalId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_OID,
        handle.as_bytes(),
    ))
}

fn fake_session_id(handle: &str) -> SessionId {
    SessionId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_URL,
        handle.as_bytes(),
    ))
}

fn fake_outcome(handle: &str, name: &str) -> AuthOutcome {
    let now = Utc::now();
    AuthOutcome {
        principal: PrincipalSummary {
            id: fake_id(handle),
            handle: handle.to_string(),
            name: name.to_string(),
        },
        session_id: fake_session_id(handle),
        tokens: TokenPair {
            access_token: AccessToken(format!("{FAKE_ACCESS_PREFIX}{handle}")),
            access_token_expires_at: now + Duration::days(1),
            refresh_token: RefreshToken(format!("{FAKE_REFRESH_PREFIX}{handle}")),
            refresh_token_expires_at: now + Duration::days(7),
        },
    }
}
