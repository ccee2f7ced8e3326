//! Bitcoin integration module.
//!
//! This module provides transaction drafting, size-based fee estimation,
//! coin selection and P2PKH signing for protocol operations.

pub mod fees;
pub mod funding;
pub mod scripts;
pub mod tx_builder;
pub mod utxo;

pub use fees::*;
pub use funding::*;
pub use scripts::*;
pub use tx_builder::*;
pub use utxo::*;
