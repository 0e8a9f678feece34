mod algorithm;
mod key_material;
mod pin;
mod policy;
mod slot;
mod tag;

pub use algorithm::{Algorithm, AlgorithmError};
pub use key_material::{KeyMaterialError, PublicKeyBytes, SignatureBytes};
pub use pin::{Pin, PinError};
pub use policy::AccessPolicy;
pub use slot::{Slot, SlotError};
pub use tag::{KeyTag, TagError};
