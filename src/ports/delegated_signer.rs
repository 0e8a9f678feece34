//! DelegatedSigner trait - what an external protocol engine may ask of the identity

use crate::logic::CrossBoundaryBuffer;

/// The two operations exposed across the runtime boundary
///
/// Both return an empty buffer when the identity cannot serve the request.
/// A non-empty result is always a complete signature or public key.
pub trait DelegatedSigner: Send + Sync {
    /// Sign `payload` with the current identity
    fn sign(&self, payload: CrossBoundaryBuffer) -> CrossBoundaryBuffer;

    /// SEC1 uncompressed public key of the current identity
    fn public_key(&self) -> CrossBoundaryBuffer;
}

impl<T: DelegatedSigner + ?Sized> DelegatedSigner for std::sync::Arc<T> {
    fn sign(&self, payload: CrossBoundaryBuffer) -> CrossBoundaryBuffer {
        (**self).sign(payload)
    }

    fn public_key(&self) -> CrossBoundaryBuffer {
        (**self).public_key()
    }
}
