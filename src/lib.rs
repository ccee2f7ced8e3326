//! # BNS Transactions
//!
//! Construction, funding and broadcast of Bitcoin transactions that carry
//! name-registration operations.
//!
//! ## Architecture
//!
//! - **btc**: Drafting, fee estimation, coin selection and signing
//! - **network**: UTXO backends, registry, relay and the overlay cache
//! - **operations**: Payload encoding and the transaction factory
//! - **utils**: Hashing, base-40 packing, keys and constants
//!
//! ## Example
//!
//! ```rust,ignore
//! use bns_tx::prelude::*;
//!
//! let provider = NetworkProvider::new(NetworkConfig::default())?;
//! let factory = TransactionFactory::new(&provider);
//!
//! let payer = PaymentKey::from_hex(payer_hex, provider.network())?;
//! let raw = factory.make_preorder("foo.id", destination, &payer).await?;
//! provider.broadcast_transaction(&raw).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod btc;
pub mod error;
pub mod network;
pub mod operations;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::btc::{
        fees::FeeRate,
        tx_builder::{SignedTx, TxDraft},
        utxo::{SelectionStrategy, Utxo},
    };
    pub use crate::error::{Error, Result};
    pub use crate::network::{
        config::{NetworkConfig, UtxoBackendKind},
        provider::NetworkProvider,
    };
    pub use crate::operations::{
        factory::TransactionFactory,
        namespace::NamespaceDefinition,
        payloads::OpCode,
        safety,
    };
    pub use crate::utils::crypto::PaymentKey;
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
