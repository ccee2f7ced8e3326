//! Network provider facade.
//!
//! One [`NetworkProvider`] owns the configured UTXO backend, the registry
//! and relay clients, and the overlay cache. The transaction factory and
//! the broadcast router only ever talk to the network through it.

use bitcoin::{Address, Network, Txid};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::btc::fees::FeeRate;
use crate::btc::scripts::{default_burn_address, parse_address};
use crate::btc::utxo::Utxo;
use crate::error::Result;
use crate::network::blockchain_info::BlockchainInfoClient;
use crate::network::broadcast::{BroadcastRouter, RelayClient};
use crate::network::config::{NetworkConfig, UtxoBackendConfig, UtxoBackendKind};
use crate::network::http::{BroadcastAck, HttpClient};
use crate::network::insight::InsightClient;
use crate::network::overlay::OverlayCache;
use crate::network::registry::{NameInfo, RegistryClient};
use crate::utils::constants::NAMESPACE_CREATOR_PAY_WINDOW;

/// Confirmation status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// Height of the confirming block; `None` while in the mempool
    pub block_height: Option<u64>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// UTXO BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// The configured UTXO service
#[derive(Debug, Clone)]
pub enum UtxoBackend {
    /// Insight REST API
    Insight(InsightClient),
    /// blockchain.info API
    BlockchainInfo(BlockchainInfoClient),
}

impl UtxoBackend {
    /// Build the backend named by `config`
    pub fn from_config(http: HttpClient, config: &UtxoBackendConfig) -> Self {
        match config.kind {
            UtxoBackendKind::Insight => UtxoBackend::Insight(InsightClient::new(http, &config.url)),
            UtxoBackendKind::BlockchainInfo => {
                UtxoBackend::BlockchainInfo(BlockchainInfoClient::new(http, &config.url))
            }
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            UtxoBackend::Insight(_) => "insight",
            UtxoBackend::BlockchainInfo(_) => "blockchain_info",
        }
    }

    /// Unspent outputs of `address`, without the overlay
    pub async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        match self {
            UtxoBackend::Insight(client) => client.get_utxos(address).await,
            UtxoBackend::BlockchainInfo(client) => client.get_utxos(address).await,
        }
    }

    /// Current chain height
    pub async fn get_block_height(&self) -> Result<u64> {
        match self {
            UtxoBackend::Insight(client) => client.get_block_height().await,
            UtxoBackend::BlockchainInfo(client) => client.get_block_height().await,
        }
    }

    /// Confirmation status of a transaction
    pub async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        match self {
            UtxoBackend::Insight(client) => client.get_transaction_info(txid).await,
            UtxoBackend::BlockchainInfo(client) => client.get_transaction_info(txid).await,
        }
    }

    /// Push a raw transaction
    pub async fn broadcast_transaction(&self, raw_hex: &str) -> Result<BroadcastAck> {
        match self {
            UtxoBackend::Insight(client) => client.broadcast_transaction(raw_hex).await,
            UtxoBackend::BlockchainInfo(client) => client.broadcast_transaction(raw_hex).await,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROVIDER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeRecommendation {
    fastest_fee: u64,
}

/// Entry point for every network interaction
#[derive(Debug)]
pub struct NetworkProvider {
    config: NetworkConfig,
    http: HttpClient,
    utxo: UtxoBackend,
    registry: RegistryClient,
    relay: RelayClient,
    overlay: OverlayCache,
}

impl NetworkProvider {
    /// Create a provider from a validated configuration
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::new(config.timeout_secs)?;
        let utxo = UtxoBackend::from_config(http.clone(), &config.utxo_backend);
        let registry = RegistryClient::new(http.clone(), &config.registry_url);
        let relay = RelayClient::new(http.clone(), &config.broadcast_url);
        let overlay = OverlayCache::new(config.network);

        debug!(backend = utxo.name(), network = %config.network, "network provider ready");

        Ok(Self {
            config,
            http,
            utxo,
            registry,
            relay,
            overlay,
        })
    }

    /// Provider configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Bitcoin network addresses belong to
    pub fn network(&self) -> Network {
        self.config.network
    }

    /// Smallest output value created by the factory
    pub fn dust_minimum(&self) -> u64 {
        self.config.dust_minimum
    }

    /// UTXO backend
    pub fn utxo_backend(&self) -> &UtxoBackend {
        &self.utxo
    }

    /// Registry client
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Overlay cache
    pub fn overlay(&self) -> &OverlayCache {
        &self.overlay
    }

    /// Router for transaction and zone-file submissions
    pub fn broadcaster(&self) -> BroadcastRouter<'_> {
        BroadcastRouter::new(
            &self.relay,
            &self.utxo,
            &self.registry,
            self.config.default_confirmations,
        )
    }

    /// Parse an address and require it to be on the configured network
    pub fn parse_address(&self, name: &str, value: &str) -> Result<Address> {
        parse_address(name, value, self.network())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Chain state
    // ───────────────────────────────────────────────────────────────────────────

    /// Unspent outputs of `address` with the overlay applied
    pub async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let raw = self.utxo.get_utxos(address).await?;
        let fetched = raw.len();
        let utxos = self.overlay.apply(address, raw)?;
        debug!(address, fetched, effective = utxos.len(), "UTXO set");
        Ok(utxos)
    }

    /// Current chain height
    pub async fn get_block_height(&self) -> Result<u64> {
        self.utxo.get_block_height().await
    }

    /// Confirmation status of a transaction; fails with `NotFound` if unknown
    pub async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        self.utxo.get_transaction_info(txid).await
    }

    /// Recommended fee rate.
    ///
    /// The fee service reports satoshis per kilobyte. When it fails and a
    /// fallback rate is configured, the fallback is used instead.
    pub async fn get_fee_rate(&self) -> Result<FeeRate> {
        match self
            .http
            .get_json::<FeeRecommendation>(&self.config.fee_service_url)
            .await
        {
            Ok(recommendation) => {
                let rate = FeeRate::from_sat_per_kb(recommendation.fastest_fee);
                debug!(sat_per_byte = rate.sat_per_byte(), "fee rate");
                Ok(rate)
            }
            Err(e) => match self.config.fee_rate_fallback {
                Some(fallback) => {
                    warn!(error = %e, fallback, "fee service unavailable, using fallback rate");
                    Ok(FeeRate::from_sat_per_byte(fallback))
                }
                None => Err(e),
            },
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Overlay
    // ───────────────────────────────────────────────────────────────────────────

    /// Reflect a signed, not yet visible transaction in later UTXO lookups
    pub fn modify_utxo_set_from(&self, raw_hex: &str) -> Result<Txid> {
        self.overlay.modify_from(raw_hex)
    }

    /// Drop overlay entries for `address`
    pub fn reset_utxos(&self, address: &str) -> Result<()> {
        self.overlay.reset(address)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Registry lookups
    // ───────────────────────────────────────────────────────────────────────────

    /// Name price, never below the dust floor
    pub async fn get_name_price(&self, name: &str) -> Result<u64> {
        let price = self.registry.get_name_price(name).await?;
        Ok(price.max(self.dust_minimum()))
    }

    /// Namespace price, never below the dust floor
    pub async fn get_namespace_price(&self, namespace_id: &str) -> Result<u64> {
        let price = self.registry.get_namespace_price(namespace_id).await?;
        Ok(price.max(self.dust_minimum()))
    }

    /// Where name fees for `namespace_id` are paid.
    ///
    /// The latest `burn_address` recorded in the namespace history wins.
    /// Without one, version-2 namespaces pay their creator for
    /// [`NAMESPACE_CREATOR_PAY_WINDOW`] blocks after the reveal; everything
    /// else burns to the all-zero address.
    pub async fn get_namespace_burn_address(&self, namespace_id: &str) -> Result<Address> {
        let info = self.registry.get_namespace_info(namespace_id).await?;

        if let Some(burn) = info.latest_burn_address() {
            return self.parse_address("burn_address", &burn);
        }

        if info.version == Some(2) {
            if let (Some(reveal_block), Some(creator)) = (info.reveal_block, info.address.as_deref()) {
                let height = self.get_block_height().await?;
                if reveal_block + NAMESPACE_CREATOR_PAY_WINDOW >= height {
                    debug!(namespace_id, creator, "paying namespace creator");
                    return self.parse_address("namespace_address", creator);
                }
            }
        }

        Ok(default_burn_address(self.network()))
    }

    /// Current consensus hash
    pub async fn get_consensus_hash(&self) -> Result<String> {
        self.registry.get_consensus_hash().await
    }

    /// Registry record for `name`; `NotFound` when unregistered
    pub async fn get_name_info(&self, name: &str) -> Result<NameInfo> {
        self.registry.get_name_info(name).await
    }

    /// Names owned by `address`
    pub async fn get_names_owned(&self, address: &str) -> Result<Vec<String>> {
        self.registry.get_names_owned(address).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Broadcast
    // ───────────────────────────────────────────────────────────────────────────

    /// Push a raw transaction straight to the UTXO backend
    pub async fn broadcast_transaction(&self, raw_hex: &str) -> Result<BroadcastAck> {
        self.broadcaster().broadcast_transaction(raw_hex, None, None).await
    }

    /// Submit a zone file straight to the registry
    pub async fn broadcast_zone_file(&self, zone_file: &str) -> Result<BroadcastAck> {
        self.broadcaster().broadcast_zone_file(zone_file, None).await
    }
}
