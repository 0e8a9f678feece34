//! Signing and verification use case

use std::sync::Arc;

use tracing::{debug, warn};

use super::IdentityStore;
use crate::logic::verify_signature;
use crate::model::SignatureBytes;
use crate::ports::HardwareKeyStore;

/// Signs with the identity of an [`IdentityStore`] and verifies signatures
pub struct SigningEngine<K> {
    store: Arc<IdentityStore<K>>,
}

impl<K> Clone for SigningEngine<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K: HardwareKeyStore> SigningEngine<K> {
    pub fn new(store: Arc<IdentityStore<K>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &IdentityStore<K> {
        &self.store
    }

    /// Sign `message` with ECDSA P-256 / SHA-256
    ///
    /// Without a `handle` the store's current identity is used. Returns
    /// `None` when no identity is enrolled, the access policy is not
    /// satisfied (denied, cancelled or timed out) or the hardware declines.
    ///
    /// May block while the hardware waits for the user. Abandoning the call
    /// does not cancel a pending prompt; its result is simply dropped.
    pub fn sign(&self, message: &[u8], handle: Option<&K::Handle>) -> Option<SignatureBytes> {
        let resolved;
        let handle = match handle {
            Some(handle) => handle,
            None => {
                resolved = self.store.retrieve()?;
                &resolved
            }
        };

        match self.store.backend().sign(handle, message) {
            Ok(signature) => {
                debug!(
                    "Signed {} bytes with tag {}",
                    message.len(),
                    self.store.tag()
                );
                Some(signature)
            }
            Err(e) => {
                warn!("Signing with tag {} failed: {}", self.store.tag(), e);
                None
            }
        }
    }

    /// See [`verify_signature`]
    pub fn verify(message: &[u8], public_key: &[u8], signature: &[u8]) -> bool {
        verify_signature(message, public_key, signature)
    }
}
