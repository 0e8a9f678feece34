//! Error types for enclave-identity
//!
//! This module defines the error hierarchy for all identity operations.
//! Errors are organized hierarchically and use thiserror for implementation.
//!
//! Only [`ProvisioningError`] is meant to reach callers as a hard failure.
//! Everything else is absorbed by the use-case layer into an absent value
//! or a `false` verification result.

use thiserror::Error;

/// Result type alias for identity operations
///
/// This is a convenience alias for `Result<T, IdentityError>`.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Top-level error type for all identity operations
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The key store could not create an identity
    #[error("Key provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    /// Hardware device errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Cryptographic operation errors
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Key management errors
    #[error("Key management error: {0}")]
    KeyManagement(#[from] KeyManagementError),

    /// The access policy attached to the key was not satisfied
    #[error("Access policy denied: {0}")]
    Policy(#[from] PolicyError),

    /// Domain validation errors
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// Delegated-signing bridge errors
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

/// Failure to create a hardware-backed identity.
///
/// This is a construction-time precondition violation: there is no
/// degraded mode for an identity with no hardware backing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    /// No secure coprocessor is present or reachable
    #[error("Secure hardware unavailable: {reason}")]
    HardwareUnavailable { reason: String },

    /// The access-control object for the key could not be constructed
    #[error("Cannot build access control for key: {reason}")]
    AccessControl { reason: String },

    /// The coprocessor refused to create the key pair
    #[error("Failed to create key pair: {reason}")]
    KeyCreationFailed { reason: String },
}

/// Hardware device-related errors
#[derive(Error, Debug)]
pub enum DeviceError {
    /// PIN verification failed
    #[error("PIN verification failed: {reason}")]
    PinVerificationFailed { reason: String },

    /// The key store's internal state is unusable
    #[error("Key store state poisoned")]
    Poisoned,

    /// Underlying yubikey crate error
    #[error("YubiKey library error: {0}")]
    YubikeyLib(String),
}

/// Cryptographic operation errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature generation failed
    #[error("Failed to generate signature: {reason}")]
    SignatureFailed { reason: String },
}

/// Key management errors
#[derive(Error, Debug)]
pub enum KeyManagementError {
    /// No key enrolled under the tag
    #[error("No key found for tag: {tag}")]
    KeyNotFound { tag: String },

    /// The handle refers to a key that has since been replaced
    #[error("Key for tag {tag} was superseded by a newer key")]
    Superseded { tag: String },
}

/// Reasons the hardware declined to use a key
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// Key requires an unlocked device
    #[error("device is locked")]
    DeviceLocked,

    /// User-presence check was presented and denied
    #[error("user presence check denied")]
    Denied,

    /// User-presence check was cancelled
    #[error("user presence check cancelled")]
    Cancelled,

    /// User-presence check timed out
    #[error("user presence check timed out")]
    TimedOut,
}

/// Domain validation errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// Key tag validation error
    #[error("Key tag error: {0}")]
    Tag(#[from] crate::model::TagError),

    /// Key material error
    #[error("Key material error: {0}")]
    KeyMaterial(#[from] crate::model::KeyMaterialError),
}

/// Failures observed by a protocol engine consuming the bridge
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The delegate returned an empty signature buffer
    #[error("signing unavailable: delegate returned an empty signature")]
    SigningUnavailable,

    /// The delegate returned an empty public key buffer
    #[error("identity unavailable: delegate returned an empty public key")]
    IdentityUnavailable,

    /// The delegate returned bytes that are not a valid public key
    #[error("delegate returned a malformed public key")]
    MalformedPublicKey,
}

impl From<crate::model::TagError> for IdentityError {
    fn from(err: crate::model::TagError) -> Self {
        IdentityError::Domain(DomainError::Tag(err))
    }
}

impl From<crate::model::KeyMaterialError> for IdentityError {
    fn from(err: crate::model::KeyMaterialError) -> Self {
        IdentityError::Domain(DomainError::KeyMaterial(err))
    }
}

/// Convert yubikey crate errors to our error type
#[cfg(feature = "piv")]
impl From<yubikey::Error> for IdentityError {
    fn from(err: yubikey::Error) -> Self {
        IdentityError::Device(DeviceError::YubikeyLib(err.to_string()))
    }
}
