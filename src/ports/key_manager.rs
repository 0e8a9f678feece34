//! KeyManager trait - capability to create and look up identity keys

use crate::error::{IdentityResult, ProvisioningError};
use crate::model::{AccessPolicy, KeyTag, PublicKeyBytes};

/// Capability to manage the hardware-resident identity key of a tag
///
/// Implementations hold at most one key per tag. The private half never
/// leaves the key store; callers only receive an opaque [`KeyManager::Handle`].
pub trait KeyManager {
    /// Opaque reference to a key inside the store. Carries no key bytes.
    type Handle;

    /// Replace whatever key is stored under `tag` with a fresh P-256 key pair
    ///
    /// Deleting a missing key is a no-op. The old key is gone once this
    /// returns, so callers check [`KeyManager::retrieve`] first.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] if the store has no secure hardware or
    /// cannot honor `policy`
    fn generate(
        &self,
        tag: &KeyTag,
        policy: AccessPolicy,
    ) -> Result<Self::Handle, ProvisioningError>;

    /// Look up the key stored under `tag`
    ///
    /// Returns `Ok(None)` when nothing is enrolled. Has no side effects.
    fn retrieve(&self, tag: &KeyTag) -> IdentityResult<Option<Self::Handle>>;

    /// Derive the public half of a stored key
    ///
    /// # Errors
    ///
    /// Returns errors if the handle no longer refers to a stored key or the
    /// store refuses the export
    fn export_public_key(&self, handle: &Self::Handle) -> IdentityResult<PublicKeyBytes>;
}
