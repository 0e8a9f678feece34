//! Delegated signing across a runtime boundary
//!
//! [`DelegatedSigningBridge`] is the identity side: it answers the two
//! callbacks a protocol engine is allowed to make. [`RemoteIdentity`] is the
//! engine side: it turns the empty-buffer sentinel back into errors so the
//! engine never mistakes "no signature" for a zero-length one.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::logic::{from_boundary, to_boundary, CrossBoundaryBuffer};
use crate::model::{Algorithm, PublicKeyBytes};
use crate::ports::{DelegatedSigner, HardwareKeyStore};
use crate::use_cases::{IdentityStore, SigningEngine};

/// Serves sign and public-key requests for the current identity of a store
pub struct DelegatedSigningBridge<K> {
    engine: SigningEngine<K>,
}

impl<K: HardwareKeyStore> DelegatedSigningBridge<K> {
    pub fn new(store: Arc<IdentityStore<K>>) -> Self {
        Self {
            engine: SigningEngine::new(store),
        }
    }

    pub fn from_engine(engine: SigningEngine<K>) -> Self {
        Self { engine }
    }

    /// Sign the payload with the current identity; empty on any failure
    pub fn sign_callback(&self, payload: CrossBoundaryBuffer) -> CrossBoundaryBuffer {
        let message = from_boundary(payload);
        match self.engine.sign(&message, None) {
            Some(signature) => to_boundary(signature.as_bytes()),
            None => {
                debug!("Sign callback returning empty buffer");
                CrossBoundaryBuffer::new()
            }
        }
    }

    /// Public key of the current identity; empty when none is available
    pub fn public_key_callback(&self) -> CrossBoundaryBuffer {
        match self.engine.store().current_public_key() {
            Some(public) => to_boundary(public.as_bytes()),
            None => {
                debug!("Public key callback returning empty buffer");
                CrossBoundaryBuffer::new()
            }
        }
    }
}

impl<K> DelegatedSigner for DelegatedSigningBridge<K>
where
    K: HardwareKeyStore + Send + Sync,
{
    fn sign(&self, payload: CrossBoundaryBuffer) -> CrossBoundaryBuffer {
        self.sign_callback(payload)
    }

    fn public_key(&self) -> CrossBoundaryBuffer {
        self.public_key_callback()
    }
}

/// A protocol engine's view of an identity reachable only through a
/// [`DelegatedSigner`]
#[derive(Debug)]
pub struct RemoteIdentity<D> {
    delegate: D,
    public_key: PublicKeyBytes,
}

impl<D: DelegatedSigner> RemoteIdentity<D> {
    /// Fetch the public key once up front
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::IdentityUnavailable` when the delegate has no
    /// identity, `BridgeError::MalformedPublicKey` when it answers with
    /// something that is not a SEC1 P-256 point
    pub fn new(delegate: D) -> Result<Self, BridgeError> {
        let buffer = delegate.public_key();
        if buffer.is_empty() {
            return Err(BridgeError::IdentityUnavailable);
        }

        let public_key = PublicKeyBytes::from_sec1(from_boundary(buffer)).map_err(|e| {
            warn!("Delegate returned an unusable public key: {}", e);
            BridgeError::MalformedPublicKey
        })?;

        Ok(Self {
            delegate,
            public_key,
        })
    }

    pub fn public_key(&self) -> &PublicKeyBytes {
        &self.public_key
    }

    pub fn algorithm(&self) -> Algorithm {
        Algorithm::identity()
    }

    /// The identity's scheme if the peer offered it
    pub fn choose_algorithm(&self, offered: &[Algorithm]) -> Option<Algorithm> {
        offered
            .iter()
            .copied()
            .find(|algorithm| *algorithm == self.algorithm())
    }

    /// DER signature over `message`
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::SigningUnavailable` when the delegate answers
    /// with an empty buffer
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BridgeError> {
        let signature = self.delegate.sign(to_boundary(message));
        if signature.is_empty() {
            return Err(BridgeError::SigningUnavailable);
        }
        Ok(from_boundary(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SoftwareEnclave;
    use crate::error::PolicyError;
    use crate::logic::verify_signature;
    use crate::model::AccessPolicy;
    use crate::use_cases::IdentityConfig;

    fn store() -> Arc<IdentityStore<SoftwareEnclave>> {
        Arc::new(IdentityStore::new(
            SoftwareEnclave::new(),
            IdentityConfig::default(),
        ))
    }

    #[derive(Debug)]
    struct StubDelegate {
        public_key: Vec<u8>,
        signature: Vec<u8>,
    }

    impl DelegatedSigner for StubDelegate {
        fn sign(&self, _payload: CrossBoundaryBuffer) -> CrossBoundaryBuffer {
            self.signature.clone().into()
        }

        fn public_key(&self) -> CrossBoundaryBuffer {
            self.public_key.clone().into()
        }
    }

    #[test]
    fn test_callbacks_empty_without_identity() {
        let bridge = DelegatedSigningBridge::new(store());
        assert!(bridge.public_key_callback().is_empty());
        assert!(bridge.sign_callback(to_boundary(b"hello")).is_empty());
    }

    #[test]
    fn test_callbacks_match_engine_output() {
        let store = store();
        let engine = SigningEngine::new(Arc::clone(&store));
        let bridge = DelegatedSigningBridge::from_engine(engine.clone());
        let handle = store.generate().unwrap();
        let public = store.export_public_key(&handle).unwrap();

        assert_eq!(bridge.public_key_callback().as_slice(), public.as_bytes());

        // RFC 6979 nonces make the two signatures identical
        let direct = engine.sign(b"handshake transcript", Some(&handle)).unwrap();
        let bridged = bridge.sign_callback(to_boundary(b"handshake transcript"));
        assert_eq!(bridged.as_slice(), direct.as_bytes());
        assert!(verify_signature(
            b"handshake transcript",
            public.as_bytes(),
            bridged.as_slice()
        ));
    }

    #[test]
    fn test_sign_callback_empty_when_locked() {
        let store = store();
        store.generate().unwrap();
        let bridge = DelegatedSigningBridge::new(Arc::clone(&store));

        store.backend().lock();
        assert!(bridge.sign_callback(to_boundary(b"hello")).is_empty());
        // Public key stays available
        assert!(!bridge.public_key_callback().is_empty());
    }

    #[test]
    fn test_sign_callback_empty_when_presence_times_out() {
        let enclave = SoftwareEnclave::new().with_presence_verifier(
            |_: &str| -> Result<(), PolicyError> { Err(PolicyError::TimedOut) },
        );
        let config = IdentityConfig::default().with_policy(AccessPolicy::UnlockedDeviceWithPresence);
        let store = Arc::new(IdentityStore::new(enclave, config));
        store.generate().unwrap();
        let bridge = DelegatedSigningBridge::new(Arc::clone(&store));

        assert!(bridge.sign_callback(to_boundary(b"hello")).is_empty());
        assert!(!bridge.public_key_callback().is_empty());

        let remote = RemoteIdentity::new(bridge).unwrap();
        assert_eq!(
            remote.sign(b"hello").unwrap_err(),
            BridgeError::SigningUnavailable
        );
    }

    #[test]
    fn test_remote_identity_round_trip() {
        let store = store();
        store.generate().unwrap();
        let delegate: Arc<dyn DelegatedSigner> =
            Arc::new(DelegatedSigningBridge::new(Arc::clone(&store)));

        let remote = RemoteIdentity::new(delegate).unwrap();
        assert_eq!(remote.public_key(), &store.current_public_key().unwrap());

        let signature = remote.sign(b"client hello").unwrap();
        assert!(verify_signature(
            b"client hello",
            remote.public_key().as_bytes(),
            &signature
        ));
    }

    #[test]
    fn test_remote_identity_unavailable() {
        let bridge = DelegatedSigningBridge::new(store());
        assert!(matches!(
            RemoteIdentity::new(bridge),
            Err(BridgeError::IdentityUnavailable)
        ));
    }

    #[test]
    fn test_remote_identity_malformed_public_key() {
        let delegate = StubDelegate {
            public_key: vec![0x02; 33],
            signature: vec![0x30],
        };
        assert!(matches!(
            RemoteIdentity::new(delegate),
            Err(BridgeError::MalformedPublicKey)
        ));
    }

    #[test]
    fn test_remote_identity_empty_signature_is_error() {
        let store = store();
        store.generate().unwrap();
        let public = store.current_public_key().unwrap();
        let delegate = StubDelegate {
            public_key: public.into_vec(),
            signature: Vec::new(),
        };

        let remote = RemoteIdentity::new(delegate).unwrap();
        assert_eq!(
            remote.sign(b"hello").unwrap_err(),
            BridgeError::SigningUnavailable
        );
    }

    #[test]
    fn test_choose_algorithm() {
        let store = store();
        store.generate().unwrap();
        let remote = RemoteIdentity::new(DelegatedSigningBridge::new(store)).unwrap();

        assert_eq!(
            remote.choose_algorithm(&[Algorithm::Ed25519, Algorithm::EcdsaP256Sha256]),
            Some(Algorithm::EcdsaP256Sha256)
        );
        assert_eq!(
            remote.choose_algorithm(&[Algorithm::Ed25519, Algorithm::RsaPkcs1Sha256]),
            None
        );
    }
}
