//! Signer trait - capability to sign with a stored key

use super::KeyManager;
use crate::error::IdentityResult;
use crate::model::SignatureBytes;

/// Capability to sign data using a key held by a [`KeyManager`]
pub trait Signer: KeyManager {
    /// Sign `message` with ECDSA P-256 / SHA-256
    ///
    /// The message is hashed inside the operation; callers must not pre-hash.
    /// May block for as long as the key's access policy needs (for example
    /// while a user-presence prompt is showing).
    ///
    /// # Returns
    ///
    /// DER-encoded signature bytes
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// - The handle no longer refers to a stored key
    /// - The access policy is not satisfied
    /// - The hardware declines the operation
    fn sign(&self, handle: &Self::Handle, message: &[u8]) -> IdentityResult<SignatureBytes>;
}
