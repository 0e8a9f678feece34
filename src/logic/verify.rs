use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use tracing::debug;

use crate::model::PublicKeyBytes;

/// Checks an ECDSA P-256 / SHA-256 DER signature against a SEC1 public key.
///
/// Only the 65-byte uncompressed form is accepted as a key. Malformed or
/// compressed keys, malformed signatures and genuine mismatches all yield
/// `false`. Needs no key store and never waits on the user.
pub fn verify_signature(message: &[u8], public_key: &[u8], signature: &[u8]) -> bool {
    if let Err(e) = PublicKeyBytes::from_sec1(public_key.to_vec()) {
        debug!("Rejecting public key: {}", e);
        return false;
    }

    let verifying_key = match VerifyingKey::from_sec1_bytes(public_key) {
        Ok(key) => key,
        Err(_) => {
            debug!("Rejecting malformed public key ({} bytes)", public_key.len());
            return false;
        }
    };

    let signature = match Signature::from_der(signature) {
        Ok(signature) => signature,
        Err(_) => {
            debug!("Rejecting malformed signature ({} bytes)", signature.len());
            return false;
        }
    };

    verifying_key.verify(message, &signature).is_ok()
}
