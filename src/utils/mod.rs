//! Utility modules shared across the crate.
//!
//! - Constants
//! - Hashing and base-40 packing
//! - Signing keys

pub mod codec;
pub mod constants;
pub mod crypto;

pub use codec::*;
pub use constants::*;
pub use crypto::*;
