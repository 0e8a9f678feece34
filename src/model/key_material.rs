use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Exported public half of an identity: SEC1 uncompressed P-256 point
/// (`0x04 || X || Y`).
///
/// Always recomputed from the current identity, never cached as the source
/// of truth.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyBytes(Vec<u8>);

impl PublicKeyBytes {
    pub const LENGTH: usize = 65;

    const UNCOMPRESSED_TAG: u8 = 0x04;

    pub fn from_sec1(bytes: Vec<u8>) -> Result<Self, KeyMaterialError> {
        if bytes.len() != Self::LENGTH {
            return Err(KeyMaterialError::InvalidLength {
                expected: Self::LENGTH,
                actual: bytes.len(),
            });
        }
        if bytes[0] != Self::UNCOMPRESSED_TAG {
            return Err(KeyMaterialError::NotUncompressed { tag: bytes[0] });
        }
        Ok(Self(bytes))
    }

    pub fn from_verifying_key(key: &p256::ecdsa::VerifyingKey) -> Self {
        Self(key.to_encoded_point(false).as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Short display identifier, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..8])
    }
}

impl AsRef<[u8]> for PublicKeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

/// DER-encoded ECDSA `(r, s)` pair. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureBytes(Vec<u8>);

impl SignatureBytes {
    pub fn from_der(bytes: Vec<u8>) -> Result<Self, KeyMaterialError> {
        if bytes.is_empty() {
            return Err(KeyMaterialError::Empty);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for SignatureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<p256::ecdsa::Signature> for SignatureBytes {
    fn from(signature: p256::ecdsa::Signature) -> Self {
        Self(signature.to_der().as_bytes().to_vec())
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes)", self.0.len())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterialError {
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Expected uncompressed point tag 0x04, got {tag:#04x}")]
    NotUncompressed { tag: u8 },

    #[error("Key material must not be empty")]
    Empty,
}
