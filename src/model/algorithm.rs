//! Signature schemes a protocol engine may negotiate

use thiserror::Error;

/// Signature scheme identifier
///
/// The digest is part of the scheme: signing with
/// [`Algorithm::EcdsaP256Sha256`] hashes the message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// ECDSA over NIST P-256 with SHA-256
    EcdsaP256Sha256,
    /// ECDSA over NIST P-384 with SHA-384
    EcdsaP384Sha384,
    /// Ed25519 (EdDSA with Curve25519)
    Ed25519,
    /// RSA PKCS#1 v1.5 with SHA-256
    RsaPkcs1Sha256,
}

impl Algorithm {
    /// The only scheme an identity key supports
    pub fn identity() -> Self {
        Self::EcdsaP256Sha256
    }

    /// Convert to yubikey crate's AlgorithmId
    ///
    /// # Errors
    ///
    /// Returns `AlgorithmError::Unsupported` for schemes PIV cannot generate
    #[cfg(feature = "piv")]
    pub fn to_yubikey_algorithm_id(self) -> Result<yubikey::piv::AlgorithmId, AlgorithmError> {
        match self {
            Algorithm::EcdsaP256Sha256 => Ok(yubikey::piv::AlgorithmId::EccP256),
            Algorithm::EcdsaP384Sha384 => Ok(yubikey::piv::AlgorithmId::EccP384),
            Algorithm::RsaPkcs1Sha256 => Ok(yubikey::piv::AlgorithmId::Rsa2048),
            Algorithm::Ed25519 => Err(AlgorithmError::Unsupported {
                algorithm: format!("{:?}", self),
            }),
        }
    }
}

/// Errors that can occur when working with algorithms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    #[error("Algorithm not supported: {algorithm}")]
    Unsupported { algorithm: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_algorithm() {
        assert_eq!(Algorithm::identity(), Algorithm::EcdsaP256Sha256);
    }

    #[cfg(feature = "piv")]
    #[test]
    fn test_algorithm_conversion() {
        let alg = Algorithm::identity().to_yubikey_algorithm_id().unwrap();
        assert_eq!(alg, yubikey::piv::AlgorithmId::EccP256);
        assert!(Algorithm::Ed25519.to_yubikey_algorithm_id().is_err());
    }

    #[test]
    fn test_algorithm_error_display() {
        let err = AlgorithmError::Unsupported {
            algorithm: "Unknown".to_string(),
        };
        assert!(err.to_string().contains("not supported"));
    }
}
