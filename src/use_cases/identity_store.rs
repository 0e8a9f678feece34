//! Identity store use case
//!
//! Binds a key store backend to the application's tag and access policy.
//! Built once at startup and shared by the signing engine and the bridge.

use tracing::{debug, info, warn};

use crate::error::ProvisioningError;
use crate::model::{AccessPolicy, KeyTag, PublicKeyBytes};
use crate::ports::KeyManager;

/// Tag used when the application does not choose its own
pub const DEFAULT_TAG: KeyTag = KeyTag::from_static("enclave-identity");

/// Configuration for the application's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Stable tag the identity key is stored under
    pub tag: KeyTag,
    /// Policy attached to keys generated by this store
    pub policy: AccessPolicy,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG,
            policy: AccessPolicy::default(),
        }
    }
}

impl IdentityConfig {
    pub fn new(tag: KeyTag) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// The single identity of an application, held in a key store backend
///
/// Operations on the same tag are not serialized here. Regenerating while a
/// signature is pending leaves the outcome to the backend; callers that need
/// exactly-once identity semantics serialize the two themselves.
#[derive(Debug)]
pub struct IdentityStore<K> {
    backend: K,
    config: IdentityConfig,
}

impl<K: KeyManager> IdentityStore<K> {
    pub fn new(backend: K, config: IdentityConfig) -> Self {
        Self { backend, config }
    }

    pub fn tag(&self) -> &KeyTag {
        &self.config.tag
    }

    pub fn policy(&self) -> AccessPolicy {
        self.config.policy
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    /// Destroy any current identity and create a new one
    ///
    /// Irreversible: check [`IdentityStore::retrieve`] before calling.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] when the backend has no usable secure
    /// hardware or cannot attach the configured policy
    pub fn generate(&self) -> Result<K::Handle, ProvisioningError> {
        info!("Generating identity for tag {}", self.config.tag);
        self.backend
            .generate(&self.config.tag, self.config.policy)
            .inspect_err(|e| warn!("Provisioning for tag {} failed: {}", self.config.tag, e))
    }

    /// Current identity, if one is enrolled
    pub fn retrieve(&self) -> Option<K::Handle> {
        match self.backend.retrieve(&self.config.tag) {
            Ok(handle) => {
                if handle.is_none() {
                    debug!("No identity enrolled for tag {}", self.config.tag);
                }
                handle
            }
            Err(e) => {
                warn!("Identity lookup for tag {} failed: {}", self.config.tag, e);
                None
            }
        }
    }

    /// Existing identity, or a newly generated one when none is enrolled
    pub fn retrieve_or_generate(&self) -> Result<K::Handle, ProvisioningError> {
        match self.retrieve() {
            Some(handle) => Ok(handle),
            None => self.generate(),
        }
    }

    pub fn export_public_key(&self, handle: &K::Handle) -> Option<PublicKeyBytes> {
        self.backend
            .export_public_key(handle)
            .inspect_err(|e| warn!("Public key export for tag {} failed: {}", self.config.tag, e))
            .ok()
    }

    /// Public key of the current identity
    pub fn current_public_key(&self) -> Option<PublicKeyBytes> {
        let handle = self.retrieve()?;
        self.export_public_key(&handle)
    }
}
