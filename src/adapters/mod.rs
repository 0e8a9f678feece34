//! Adapters - concrete implementations of ports (traits)

mod software_enclave;
#[cfg(feature = "piv")]
mod yubikey_piv;

// Re-export for convenience
pub use software_enclave::{EnclaveKeyRef, SoftwareEnclave};
#[cfg(feature = "piv")]
pub use yubikey_piv::{PivKeyRef, PivKeyStore};
