//! Hardware-backed P-256 signing identity
//!
//! An application owns one identity, stored under a fixed tag in a secure
//! coprocessor. The private key never leaves the hardware: callers get a
//! handle, an exported public key and signatures. [`bridge`] lets a protocol
//! engine in another runtime use the identity through two byte-buffer
//! callbacks.

pub mod adapters;
pub mod api;
pub mod bridge;
pub mod error;
pub mod logic;
pub mod model;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use bridge::{DelegatedSigningBridge, RemoteIdentity};
pub use error::{IdentityError, IdentityResult, ProvisioningError};
pub use logic::{verify_signature, CrossBoundaryBuffer};
pub use use_cases::{IdentityConfig, IdentityStore, SigningEngine, DEFAULT_TAG};

// Re-export public API
pub use api::{delegated_signer, open_software_identity, signing_engine};
#[cfg(feature = "piv")]
pub use api::open_piv_identity;
