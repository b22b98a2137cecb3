//! Per-principal signing material.
//!
//! A [`KeyPair`] is the only in-process representation of key material. Stores
//! persist the PEM text form ([`EncodedKeyPair`]) and convert at their edge, so
//! signing and verification always receive ready-to-use key objects.

use argon2::password_hash::rand_core::OsRng;
use ed25519_dalek::{SigningKey, VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use std::fmt;

/// PKCS#8 v1 `PrivateKeyInfo` header for an Ed25519 seed (RFC 8410).
const ED25519_PKCS8_V1_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key encode error: {0}")]
    Encode(String),
    #[error("key decode error: {0}")]
    Decode(String),
    #[error("public key does not belong to private key")]
    Mismatch,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_pem(&self) -> Result<String, KeyError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encode(e.to_string()))
    }

    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        VerifyingKey::from_public_key_pem(pem)
            .map(PublicKey)
            .map_err(|e| KeyError::Decode(e.to_string()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.as_bytes()))
    }
}

#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// DER `PrivateKeyInfo` (version 1) as accepted by the JWT signer.
    pub fn to_pkcs8_v1_der(&self) -> Vec<u8> {
        let mut der = Vec::with_capacity(ED25519_PKCS8_V1_PREFIX.len() + 32);
        der.extend_from_slice(&ED25519_PKCS8_V1_PREFIX);
        der.extend_from_slice(self.0.as_bytes());
        der
    }

    pub fn to_pem(&self) -> Result<String, KeyError> {
        self.0
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| KeyError::Encode(e.to_string()))
    }

    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        SigningKey::from_pkcs8_pem(pem)
            .map(PrivateKey)
            .map_err(|e| KeyError::Decode(e.to_string()))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

#[derive(Clone, Debug)]
pub struct KeyPair {
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl KeyPair {
    /// Draws a fresh Ed25519 key from the OS CSPRNG.
    pub fn generate() -> Self {
        Self::from_private_key(PrivateKey(SigningKey::generate(&mut OsRng)))
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        KeyPair {
            public_key: private_key.public_key(),
            private_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn encode(&self) -> Result<EncodedKeyPair, KeyError> {
        Ok(EncodedKeyPair {
            public_key_pem: self.public_key.to_pem()?,
            private_key_pem: self.private_key.to_pem()?,
        })
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for KeyPair {}

/// Text form of a [`KeyPair`], as persisted by session stores.
#[derive(Clone)]
pub struct EncodedKeyPair {
    pub public_key_pem: String,
    pub private_key_pem: String,
}

impl EncodedKeyPair {
    pub fn decode(&self) -> Result<KeyPair, KeyError> {
        let private_key = PrivateKey::from_pem(&self.private_key_pem)?;
        let public_key = PublicKey::from_pem(&self.public_key_pem)?;
        if private_key.public_key() != public_key {
            return Err(KeyError::Mismatch);
        }
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }
}

impl fmt::Debug for EncodedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedKeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}
