//! Use cases (orchestration)
//!
//! This module contains use cases that orchestrate operations across multiple ports.
//! Hardware failures are absorbed here: callers see absent values, and only
//! provisioning errors propagate.

mod identity_store;
mod signing_engine;

pub use identity_store::{IdentityConfig, IdentityStore, DEFAULT_TAG};
pub use signing_engine::SigningEngine;
