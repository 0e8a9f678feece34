//! Ports (algebras/traits) for identity key operations
//!
//! These traits define the capabilities required by the use cases and the
//! bridge. They represent ports in hexagonal architecture - the core depends
//! on these abstractions, not on a particular secure coprocessor.

mod delegated_signer;
mod key_manager;
mod presence;
mod signer;

pub use delegated_signer::DelegatedSigner;
pub use key_manager::KeyManager;
pub use presence::{ConfirmPresence, PresenceVerifier};
pub use signer::Signer;

/// Combined trait for a key store that can both hold and use keys
///
/// A concrete hardware adapter typically implements this.
pub trait HardwareKeyStore: KeyManager + Signer {}

// Blanket implementation for types that implement all operation traits
impl<T> HardwareKeyStore for T where T: KeyManager + Signer {}
