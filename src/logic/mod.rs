pub mod codec;
mod verify;

pub use codec::{from_boundary, from_hex, to_boundary, to_hex, CrossBoundaryBuffer};
pub use verify::verify_signature;
