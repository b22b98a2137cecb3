use crate::domain_model::*;
use crate::domain_port::SessionStoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("handle already registered")]
    HandleTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("session compromised")]
    SessionCompromised,
    #[error("signing error: {0}")]
    Signing(String),
    #[error("verification error: {0}")]
    Verification(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token malformed")]
    Malformed,
    #[error("token signature invalid")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token of the wrong kind")]
    WrongKind,
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("key rejected: {0}")]
    Key(String),
}

/// Token problems the caller caused collapse into `Unauthenticated`;
/// key and signing faults stay distinct for operators.
impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed
            | TokenError::InvalidSignature
            | TokenError::Expired
            | TokenError::WrongKind => AuthError::Unauthenticated,
            TokenError::Signing(e) => AuthError::Signing(e),
            TokenError::Key(e) => AuthError::Verification(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub handle: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub handle: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub principal: PrincipalSummary,
    pub session_id: SessionId,
    pub tokens: TokenPair,
}

/// Attached to a request once its access token checked out.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_id: SessionId,
    pub claims: Claims,
}

#[async_trait::async_trait]
pub trait KeyMaterialGenerator: Send + Sync {
    async fn generate(&self) -> Result<KeyPair, AuthError>;
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue(
        &self,
        claims: &PrincipalClaims,
        key_pair: &KeyPair,
    ) -> Result<TokenPair, TokenError>;
    async fn verify_access_token(
        &self,
        token: &AccessToken,
        public_key: &PublicKey,
    ) -> Result<Claims, TokenError>;
    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
        public_key: &PublicKey,
    ) -> Result<Claims, TokenError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<AuthOutcome, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<AuthOutcome, AuthError>;
    async fn refresh(
        &self,
        refresh_token: &str,
        claimed: PrincipalId,
    ) -> Result<AuthOutcome, AuthError>;
    async fn logout(&self, session_id: SessionId) -> Result<(), AuthError>;
    async fn authenticate(
        &self,
        access_token: &str,
        claimed: PrincipalId,
    ) -> Result<AuthContext, AuthError>;
}
