//! Network layer.
//!
//! - UTXO backends (Insight, blockchain.info)
//! - Registry and broadcast relay clients
//! - Overlay cache for unconfirmed transactions
//! - [`NetworkProvider`] facade tying them together

pub mod blockchain_info;
pub mod broadcast;
pub mod config;
pub mod http;
pub mod insight;
pub mod overlay;
pub mod provider;
pub mod registry;

pub use blockchain_info::BlockchainInfoClient;
pub use broadcast::{BroadcastRouter, RelayClient};
pub use config::{NetworkConfig, UtxoBackendConfig, UtxoBackendKind};
pub use http::{BroadcastAck, HttpClient};
pub use insight::InsightClient;
pub use overlay::OverlayCache;
pub use provider::{NetworkProvider, TransactionInfo, UtxoBackend};
pub use registry::{NameInfo, NamespaceInfo, RegistryClient};
