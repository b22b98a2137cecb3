use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;

/// Account subsystem stand-in keyed by normalized handle.
#[derive(Default)]
pub struct MemoryPrincipalRepo {
    by_handle: DashMap<String, Principal>,
}

impl MemoryPrincipalRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&self, principal_id: PrincipalId, is_active: bool) -> bool {
        match self
            .by_handle
            .iter_mut()
            .find(|entry| entry.id == principal_id)
        {
            Some(mut entry) => {
                entry.is_active = is_active;
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for MemoryPrincipalRepo {
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

        let mut inserted = false;
        self.by_handle
            .entry(handle.to_string())
            .or_insert_with(|| {
                inserted = true;
                principal.clone()
            });
        if !inserted {
            return Err(AuthError::HandleTaken);
        }
        Ok(principal)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self.by_handle.get(handle).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, principal_id: PrincipalId) -> Result<Option<Principal>, AuthError> {
        Ok(self
            .by_handle
            .iter()
            .find(|entry| entry.id == principal_id)
            .map(|entry| entry.value().clone()))
    }
}
