use crate::application_port::{AuthError, KeyMaterialGenerator};
use crate::domain_model::KeyPair;

/// Fresh Ed25519 pair per call, generated off the async executor.
#[derive(Debug, Default)]
pub struct Ed25519KeyGenerator;

#[async_trait::async_trait]
impl KeyMaterialGenerator for Ed25519KeyGenerator {
    async fn generate(&self) -> Result<KeyPair, AuthError> {
        tokio::task::spawn_blocking(KeyPair::generate)
            .await
            .map_err(|e| AuthError::InternalError(format!("key generation task: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_reuses_key_material() {
        let generator = Ed25519KeyGenerator;
        let a = generator.generate().await.unwrap();
        let b = generator.generate().await.unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }
}
