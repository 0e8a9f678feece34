//! Software-emulated secure coprocessor
//!
//! Keeps one P-256 key per tag inside the adapter and only ever hands out
//! opaque [`EnclaveKeyRef`] handles. Used as the test double for the bridge
//! and key-store contracts, and as the backend when no hardware is present.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use rand_core::OsRng;
use tracing::{debug, info};

use crate::error::{
    DeviceError, IdentityResult, KeyManagementError, PolicyError, ProvisioningError,
};
use crate::model::{AccessPolicy, KeyTag, PublicKeyBytes, SignatureBytes};
use crate::ports::{ConfirmPresence, KeyManager, PresenceVerifier, Signer};

struct StoredKey {
    generation: u64,
    signing_key: SigningKey,
    policy: AccessPolicy,
}

/// Handle to a key inside a [`SoftwareEnclave`]
///
/// Names the tag and the generation of the key it was issued for. Once the
/// tag is regenerated the handle is stale and every operation on it fails.
#[derive(Debug, PartialEq, Eq)]
pub struct EnclaveKeyRef {
    tag: KeyTag,
    generation: u64,
}

impl EnclaveKeyRef {
    pub fn tag(&self) -> &KeyTag {
        &self.tag
    }
}

/// In-process key store emulating a secure coprocessor
pub struct SoftwareEnclave {
    keys: Mutex<HashMap<KeyTag, StoredKey>>,
    next_generation: AtomicU64,
    unlocked: AtomicBool,
    available: bool,
    presence: Box<dyn PresenceVerifier>,
}

impl SoftwareEnclave {
    /// Unlocked enclave that confirms every user-presence request
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            unlocked: AtomicBool::new(true),
            available: true,
            presence: Box::new(ConfirmPresence),
        }
    }

    /// A device without a secure coprocessor: generation always fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_presence_verifier(mut self, verifier: impl PresenceVerifier + 'static) -> Self {
        self.presence = Box::new(verifier);
        self
    }

    pub fn lock(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
        debug!("Software enclave locked");
    }

    pub fn unlock(&self) {
        self.unlocked.store(true, Ordering::SeqCst);
        debug!("Software enclave unlocked");
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    fn keys(&self) -> IdentityResult<MutexGuard<'_, HashMap<KeyTag, StoredKey>>> {
        self.keys
            .lock()
            .map_err(|_| DeviceError::Poisoned.into())
    }

    fn current<'a>(
        keys: &'a HashMap<KeyTag, StoredKey>,
        handle: &EnclaveKeyRef,
    ) -> IdentityResult<&'a StoredKey> {
        let entry = keys.get(&handle.tag).ok_or_else(|| {
            KeyManagementError::KeyNotFound {
                tag: handle.tag.to_string(),
            }
        })?;

        if entry.generation != handle.generation {
            return Err(KeyManagementError::Superseded {
                tag: handle.tag.to_string(),
            }
            .into());
        }

        Ok(entry)
    }
}

impl Default for SoftwareEnclave {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SoftwareEnclave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareEnclave")
            .field("available", &self.available)
            .field("unlocked", &self.is_unlocked())
            .finish_non_exhaustive()
    }
}

impl KeyManager for SoftwareEnclave {
    type Handle = EnclaveKeyRef;

    fn generate(
        &self,
        tag: &KeyTag,
        policy: AccessPolicy,
    ) -> Result<EnclaveKeyRef, ProvisioningError> {
        if !self.available {
            return Err(ProvisioningError::HardwareUnavailable {
                reason: "no secure coprocessor present".to_string(),
            });
        }

        let mut keys = self
            .keys
            .lock()
            .map_err(|_| ProvisioningError::KeyCreationFailed {
                reason: "key store state poisoned".to_string(),
            })?;

        if keys.remove(tag).is_some() {
            debug!("Deleted existing key for tag {}", tag);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let signing_key = SigningKey::random(&mut OsRng);
        let public = PublicKeyBytes::from_verifying_key(signing_key.verifying_key());

        keys.insert(
            tag.clone(),
            StoredKey {
                generation,
                signing_key,
                policy,
            },
        );

        info!(
            "Generated key for tag {} with policy {:?} ({})",
            tag,
            policy,
            public.fingerprint()
        );

        Ok(EnclaveKeyRef {
            tag: tag.clone(),
            generation,
        })
    }

    fn retrieve(&self, tag: &KeyTag) -> IdentityResult<Option<EnclaveKeyRef>> {
        let keys = self.keys()?;
        Ok(keys.get(tag).map(|entry| EnclaveKeyRef {
            tag: tag.clone(),
            generation: entry.generation,
        }))
    }

    fn export_public_key(&self, handle: &EnclaveKeyRef) -> IdentityResult<PublicKeyBytes> {
        let keys = self.keys()?;
        let entry = Self::current(&keys, handle)?;
        Ok(PublicKeyBytes::from_verifying_key(
            entry.signing_key.verifying_key(),
        ))
    }
}

impl Signer for SoftwareEnclave {
    fn sign(&self, handle: &EnclaveKeyRef, message: &[u8]) -> IdentityResult<SignatureBytes> {
        let policy = {
            let keys = self.keys()?;
            Self::current(&keys, handle)?.policy
        };

        if !self.is_unlocked() {
            return Err(PolicyError::DeviceLocked.into());
        }

        // The store stays unlocked while the prompt is up so other tags and
        // regeneration are not blocked behind the user.
        if policy.requires_user_presence() {
            debug!("Requesting user presence for tag {}", handle.tag);
            self.presence
                .confirm_presence(&format!("Sign with identity {}", handle.tag))?;
        }

        let keys = self.keys()?;
        let entry = Self::current(&keys, handle)?;
        let signature: Signature = entry.signing_key.sign(message);

        debug!("Signed {} bytes with tag {}", message.len(), handle.tag);
        Ok(signature.into())
    }
}
