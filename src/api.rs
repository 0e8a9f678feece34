//! Convenience constructors for the common wiring of store, engine and bridge

use std::sync::Arc;

use crate::adapters::SoftwareEnclave;
use crate::bridge::DelegatedSigningBridge;
use crate::ports::HardwareKeyStore;
use crate::use_cases::{IdentityConfig, IdentityStore, SigningEngine};

#[cfg(feature = "piv")]
use crate::adapters::PivKeyStore;
#[cfg(feature = "piv")]
use crate::error::ProvisioningError;

pub use crate::model::*;

/// Identity held by the in-process emulated coprocessor
pub fn open_software_identity(config: IdentityConfig) -> Arc<IdentityStore<SoftwareEnclave>> {
    Arc::new(IdentityStore::new(SoftwareEnclave::new(), config))
}

/// Identity held in a PIV slot of the first YubiKey found
///
/// # Errors
///
/// Returns `ProvisioningError::HardwareUnavailable` when no YubiKey answers
#[cfg(feature = "piv")]
pub fn open_piv_identity(
    config: IdentityConfig,
    slot: Slot,
    pin: Option<Pin>,
) -> Result<Arc<IdentityStore<PivKeyStore>>, ProvisioningError> {
    let mut store = PivKeyStore::open()?.with_binding(config.tag.clone(), slot);
    if let Some(pin) = pin {
        store = store.with_pin(pin);
    }
    Ok(Arc::new(IdentityStore::new(store, config)))
}

pub fn signing_engine<K: HardwareKeyStore>(store: &Arc<IdentityStore<K>>) -> SigningEngine<K> {
    SigningEngine::new(Arc::clone(store))
}

/// Bridge answering a protocol engine's callbacks for `store`
pub fn delegated_signer<K: HardwareKeyStore>(
    store: &Arc<IdentityStore<K>>,
) -> DelegatedSigningBridge<K> {
    DelegatedSigningBridge::new(Arc::clone(store))
}
