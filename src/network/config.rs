//! Network configuration.
//!
//! Selects the bitcoin network, the UTXO backend and the service endpoints a
//! [`NetworkProvider`](crate::network::NetworkProvider) talks to.

use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::{
    DEFAULT_BLOCKCHAIN_INFO_URL, DEFAULT_BROADCAST_URL, DEFAULT_CONFIRMATIONS,
    DEFAULT_FEE_SERVICE_URL, DEFAULT_INSIGHT_URL, DEFAULT_REGISTRY_URL, DEFAULT_TIMEOUT_SECS,
    DUST_MINIMUM,
};

// ═══════════════════════════════════════════════════════════════════════════════
// UTXO BACKEND SELECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of UTXO service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoBackendKind {
    /// Insight-style REST API
    Insight,
    /// Legacy blockchain.info unspent-outputs API
    BlockchainInfo,
}

impl FromStr for UtxoBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "insight" => Ok(UtxoBackendKind::Insight),
            "blockchain_info" | "blockchain-info" | "blockchaininfo" => {
                Ok(UtxoBackendKind::BlockchainInfo)
            }
            other => Err(Error::Config(format!("unknown UTXO backend: {}", other))),
        }
    }
}

/// UTXO backend endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoBackendConfig {
    /// Backend kind
    pub kind: UtxoBackendKind,
    /// Base URL
    pub url: String,
}

impl UtxoBackendConfig {
    /// Insight backend at `url`
    pub fn insight(url: impl Into<String>) -> Self {
        Self { kind: UtxoBackendKind::Insight, url: url.into() }
    }

    /// Legacy unspent-outputs backend at `url`
    pub fn blockchain_info(url: impl Into<String>) -> Self {
        Self { kind: UtxoBackendKind::BlockchainInfo, url: url.into() }
    }
}

impl Default for UtxoBackendConfig {
    fn default() -> Self {
        Self::insight(DEFAULT_INSIGHT_URL)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for a network provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bitcoin network addresses must belong to
    pub network: Network,
    /// Registry (core node) base URL
    pub registry_url: String,
    /// Broadcast relay base URL
    pub broadcast_url: String,
    /// UTXO backend
    pub utxo_backend: UtxoBackendConfig,
    /// Fee recommendation endpoint
    pub fee_service_url: String,
    /// Rate in sat/B used when the fee service fails; `None` propagates the failure
    pub fee_rate_fallback: Option<u64>,
    /// Smallest output value the factory creates
    pub dust_minimum: u64,
    /// Confirmations requested from the relay for watched broadcasts
    pub default_confirmations: u32,
    /// How far a spend may exceed the balance before it is rejected
    pub spend_overshoot_tolerance: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            registry_url: DEFAULT_REGISTRY_URL.into(),
            broadcast_url: DEFAULT_BROADCAST_URL.into(),
            utxo_backend: UtxoBackendConfig::default(),
            fee_service_url: DEFAULT_FEE_SERVICE_URL.into(),
            fee_rate_fallback: None,
            dust_minimum: DUST_MINIMUM,
            default_confirmations: DEFAULT_CONFIRMATIONS,
            spend_overshoot_tolerance: DUST_MINIMUM,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NetworkConfig {
    /// Mainnet defaults with the legacy unspent-outputs backend
    pub fn with_blockchain_info() -> Self {
        Self {
            utxo_backend: UtxoBackendConfig::blockchain_info(DEFAULT_BLOCKCHAIN_INFO_URL),
            ..Default::default()
        }
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;

        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Load from `BNS_*` environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(network) = std::env::var("BNS_NETWORK") {
            config.network = Network::from_str(&network)
                .map_err(|e| Error::Config(format!("BNS_NETWORK: {}", e)))?;
        }

        if let Ok(url) = std::env::var("BNS_REGISTRY_URL") {
            config.registry_url = url;
        }

        if let Ok(url) = std::env::var("BNS_BROADCAST_URL") {
            config.broadcast_url = url;
        }

        if let Ok(kind) = std::env::var("BNS_UTXO_BACKEND") {
            config.utxo_backend.kind = kind.parse()?;
        }

        if let Ok(url) = std::env::var("BNS_UTXO_URL") {
            config.utxo_backend.url = url;
        }

        if let Ok(url) = std::env::var("BNS_FEE_SERVICE_URL") {
            config.fee_service_url = url;
        }

        if let Ok(rate) = std::env::var("BNS_FEE_RATE_FALLBACK") {
            let rate = rate
                .parse()
                .map_err(|e| Error::Config(format!("BNS_FEE_RATE_FALLBACK: {}", e)))?;
            config.fee_rate_fallback = Some(rate);
        }

        if let Ok(timeout) = std::env::var("BNS_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                config.timeout_secs = secs;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("registry_url", &self.registry_url),
            ("broadcast_url", &self.broadcast_url),
            ("utxo_backend.url", &self.utxo_backend.url),
            ("fee_service_url", &self.fee_service_url),
        ] {
            if url.is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
        }

        if self.dust_minimum == 0 {
            return Err(Error::Config("dust_minimum must be greater than 0".into()));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be greater than 0".into()));
        }

        Ok(())
    }
}
