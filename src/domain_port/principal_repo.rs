use crate::application_port::*;
use crate::domain_model::*;

/// Outbound contract to the account subsystem.
#[async_trait::async_trait]
pub trait PrincipalRepo: Send + Sync {
    /// Fails with `HandleTaken` when the handle is already registered.
    async fn create(
        &self,
        handle: &str,
        name: &str,
        credential_hash: &str,
    ) -> Result<Principal, AuthError>;

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>, AuthError>;

    async fn find_by_id(&self, principal_id: PrincipalId) -> Result<Option<Principal>, AuthError>;
}
