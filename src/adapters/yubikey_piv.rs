//! PIV (Personal Identity Verification) implementation of the identity key store
//!
//! This module provides a YubiKey-backed [`KeyManager`] and [`Signer`] using
//! the yubikey crate's PIV functionality. Each tag is bound to one PIV slot;
//! generating a key overwrites whatever the slot held before.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use yubikey::piv::{generate, metadata, sign_data, AlgorithmId};
use yubikey::{MgmKey, YubiKey};

use crate::error::{
    CryptoError, DeviceError, IdentityError, IdentityResult, KeyManagementError,
    ProvisioningError,
};
use crate::model::{AccessPolicy, Algorithm, KeyTag, Pin, PublicKeyBytes, SignatureBytes, Slot};
use crate::ports::{KeyManager, Signer};

/// Handle to the key in the PIV slot bound to a tag
///
/// Names the slot, not a particular key. After the tag is regenerated an
/// older handle signs and exports with the new key; the card keeps no
/// generation to tell them apart, unlike [`crate::adapters::SoftwareEnclave`]
/// which refuses such handles as superseded.
#[derive(Debug, PartialEq, Eq)]
pub struct PivKeyRef {
    tag: KeyTag,
    slot: Slot,
}

impl PivKeyRef {
    pub fn tag(&self) -> &KeyTag {
        &self.tag
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }
}

/// PIV-based key store on the first connected YubiKey
///
/// Generation authenticates with the factory-default management key. A
/// card whose management key was changed refuses generation with
/// `ProvisioningError::AccessControl`; signing and lookup still work.
pub struct PivKeyStore {
    device: Mutex<YubiKey>,
    bindings: HashMap<KeyTag, Slot>,
    pin: Option<Pin>,
}

impl PivKeyStore {
    /// Connect to the first YubiKey found over PC/SC
    ///
    /// # Errors
    ///
    /// Returns `ProvisioningError::HardwareUnavailable` if no device answers
    pub fn open() -> Result<Self, ProvisioningError> {
        let device = YubiKey::open().map_err(|e| ProvisioningError::HardwareUnavailable {
            reason: format!("No YubiKey found: {}", e),
        })?;

        debug!("Connected to YubiKey serial {}", device.serial());
        Ok(Self {
            device: Mutex::new(device),
            bindings: HashMap::new(),
            pin: None,
        })
    }

    /// Store the key for `tag` in `slot`
    pub fn with_binding(mut self, tag: KeyTag, slot: Slot) -> Self {
        self.bindings.insert(tag, slot);
        self
    }

    /// PIN presented before every signature
    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pin = Some(pin);
        self
    }

    fn device(&self) -> IdentityResult<MutexGuard<'_, YubiKey>> {
        self.device.lock().map_err(|_| DeviceError::Poisoned.into())
    }

    fn slot_for(&self, tag: &KeyTag) -> Option<Slot> {
        self.bindings.get(tag).copied()
    }

    fn read_public_key(device: &mut YubiKey, slot: Slot) -> IdentityResult<Option<PublicKeyBytes>> {
        let meta = match metadata(device, slot.to_yubikey_slot_id()) {
            Ok(meta) => meta,
            Err(yubikey::Error::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some(spki) = meta.public else {
            return Ok(None);
        };

        // Keys of any other type in the slot are not ours
        match PublicKeyBytes::from_sec1(spki.subject_public_key.raw_bytes().to_vec()) {
            Ok(public) => Ok(Some(public)),
            Err(e) => {
                debug!("Slot {:?} holds a non P-256 key: {}", slot, e);
                Ok(None)
            }
        }
    }
}

impl KeyManager for PivKeyStore {
    type Handle = PivKeyRef;

    fn generate(&self, tag: &KeyTag, policy: AccessPolicy) -> Result<PivKeyRef, ProvisioningError> {
        let slot = self
            .slot_for(tag)
            .ok_or_else(|| ProvisioningError::KeyCreationFailed {
                reason: format!("tag {} is not bound to a PIV slot", tag),
            })?;

        if self.pin.is_none() {
            return Err(ProvisioningError::AccessControl {
                reason: "a PIN is required to enforce the unlocked-device policy".to_string(),
            });
        }

        let algorithm_id = Algorithm::identity()
            .to_yubikey_algorithm_id()
            .map_err(|e| ProvisioningError::KeyCreationFailed {
                reason: e.to_string(),
            })?;

        let mut device = self
            .device
            .lock()
            .map_err(|_| ProvisioningError::KeyCreationFailed {
                reason: "device state poisoned".to_string(),
            })?;

        device
            .authenticate(MgmKey::default())
            .map_err(|e| ProvisioningError::AccessControl {
                reason: format!(
                    "Authentication with the default management key failed: {}",
                    e
                ),
            })?;

        debug!(
            "Generating key for tag {} in slot {:?} with policy {:?}",
            tag, slot, policy
        );

        // Generation overwrites the slot; the previous key is destroyed
        let spki = generate(
            &mut device,
            slot.to_yubikey_slot_id(),
            algorithm_id,
            policy.to_yubikey_pin_policy(),
            policy.to_yubikey_touch_policy(),
        )
        .map_err(|e| ProvisioningError::KeyCreationFailed {
            reason: format!("Key generation failed: {}", e),
        })?;

        let public = PublicKeyBytes::from_sec1(spki.subject_public_key.raw_bytes().to_vec())
            .map_err(|e| ProvisioningError::KeyCreationFailed {
                reason: format!("Unexpected public key from device: {}", e),
            })?;

        info!(
            "Key generated for tag {} in slot {:?} ({})",
            tag,
            slot,
            public.fingerprint()
        );

        Ok(PivKeyRef {
            tag: tag.clone(),
            slot,
        })
    }

    fn retrieve(&self, tag: &KeyTag) -> IdentityResult<Option<PivKeyRef>> {
        let Some(slot) = self.slot_for(tag) else {
            debug!("Tag {} has no slot binding", tag);
            return Ok(None);
        };

        let mut device = self.device()?;
        let found = Self::read_public_key(&mut device, slot)?;

        Ok(found.map(|_| PivKeyRef {
            tag: tag.clone(),
            slot,
        }))
    }

    fn export_public_key(&self, handle: &PivKeyRef) -> IdentityResult<PublicKeyBytes> {
        let mut device = self.device()?;
        Self::read_public_key(&mut device, handle.slot)?.ok_or_else(|| {
            IdentityError::KeyManagement(KeyManagementError::KeyNotFound {
                tag: handle.tag.to_string(),
            })
        })
    }
}

impl Signer for PivKeyStore {
    fn sign(&self, handle: &PivKeyRef, message: &[u8]) -> IdentityResult<SignatureBytes> {
        let mut device = self.device()?;

        if let Some(pin) = &self.pin {
            device.verify_pin(pin.as_bytes()).map_err(|e| {
                IdentityError::Device(DeviceError::PinVerificationFailed {
                    reason: format!("PIN verification failed: {}", e),
                })
            })?;
            debug!("PIN verified");
        } else {
            warn!("No PIN configured; the device will refuse PIN-protected keys");
        }

        // PIV signs a digest, not the message
        let digest = Sha256::digest(message);

        debug!(
            "Signing {} bytes with slot {:?}; touch the device if it blinks",
            message.len(),
            handle.slot
        );

        let signature = sign_data(
            &mut device,
            &digest,
            AlgorithmId::EccP256,
            handle.slot.to_yubikey_slot_id(),
        )
        .map_err(|e| {
            IdentityError::Crypto(CryptoError::SignatureFailed {
                reason: format!("Signing failed: {}", e),
            })
        })?;

        Ok(SignatureBytes::from_der(signature.to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::contract_tests::key_store_contract::{self, CONTRACT_TAG};

    // These tests run the same contract as the software enclave against real
    // hardware. They overwrite the card-authentication slot, so they are
    // ignored unless --features hardware-tests is used.

    fn open_store() -> PivKeyStore {
        PivKeyStore::open()
            .expect("YubiKey not found")
            .with_binding(CONTRACT_TAG, Slot::CardAuthentication)
            .with_pin("123456".parse().expect("Invalid PIN"))
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_generate_then_retrieve() {
        key_store_contract::test_generate_then_retrieve(open_store());
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_sign_success() {
        key_store_contract::test_sign_success(open_store());
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_generate_replaces_key() {
        key_store_contract::test_generate_replaces_key(open_store());
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_old_handle_follows_slot() {
        let store = open_store();
        let old = store
            .generate(&CONTRACT_TAG, AccessPolicy::UnlockedDevice)
            .unwrap();
        let new = store
            .generate(&CONTRACT_TAG, AccessPolicy::UnlockedDevice)
            .unwrap();

        assert_eq!(old, new);
        assert_eq!(
            store.export_public_key(&old).unwrap(),
            store.export_public_key(&new).unwrap()
        );
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_unbound_tag() {
        let store = open_store();
        let tag = KeyTag::from_static("unbound");
        assert!(store.retrieve(&tag).unwrap().is_none());
        assert!(matches!(
            store.generate(&tag, AccessPolicy::UnlockedDevice).unwrap_err(),
            ProvisioningError::KeyCreationFailed { .. }
        ));
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_generate_without_pin() {
        let store = PivKeyStore::open()
            .expect("YubiKey not found")
            .with_binding(CONTRACT_TAG, Slot::CardAuthentication);
        assert!(matches!(
            store
                .generate(&CONTRACT_TAG, AccessPolicy::UnlockedDevice)
                .unwrap_err(),
            ProvisioningError::AccessControl { .. }
        ));
    }

    #[test]
    fn test_open_without_device() {
        // May succeed or fail depending on hardware availability
        if let Err(err) = PivKeyStore::open() {
            assert!(matches!(err, ProvisioningError::HardwareUnavailable { .. }));
        }
    }
}
