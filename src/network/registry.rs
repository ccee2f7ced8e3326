//! Registry ("core" node) client.
//!
//! Price, namespace, consensus and name lookups, plus direct zone-file
//! ingestion when no relay is involved.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::network::http::{acknowledge, decode_json, ensure_success, join_url, BroadcastAck, HttpClient};

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct Satoshis {
    satoshis: u64,
}

#[derive(Debug, Deserialize)]
struct NamePriceResponse {
    name_price: Satoshis,
}

#[derive(Debug, Deserialize)]
struct ConsensusResponse {
    consensus_hash: String,
}

#[derive(Debug, Deserialize)]
struct NamesOwnedResponse {
    #[serde(default)]
    names: Vec<String>,
}

/// Namespace record as served by the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// Namespace rules version
    #[serde(default)]
    pub version: Option<u16>,
    /// Block at which the namespace was revealed
    #[serde(default)]
    pub reveal_block: Option<u64>,
    /// Creator address
    #[serde(default)]
    pub address: Option<String>,
    /// Per-block history entries keyed by block height
    #[serde(default)]
    pub history: BTreeMap<String, Vec<serde_json::Value>>,
}

impl NamespaceInfo {
    /// `burn_address` of the most recent history entry that sets one
    pub fn latest_burn_address(&self) -> Option<String> {
        let mut heights: Vec<(u64, &Vec<serde_json::Value>)> = self
            .history
            .iter()
            .filter_map(|(height, entries)| height.parse().ok().map(|h| (h, entries)))
            .collect();
        heights.sort_by_key(|(h, _)| *h);

        heights
            .into_iter()
            .filter_map(|(_, entries)| entries.first()?.get("burn_address")?.as_str())
            .last()
            .map(str::to_string)
    }
}

/// Name record as served by the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameInfo {
    /// Current owner address
    #[serde(default)]
    pub address: Option<String>,
    /// Block at which the name expires
    #[serde(default, alias = "expires_block")]
    pub expire_block: Option<u64>,
    /// Hash of the current zone file
    #[serde(default)]
    pub zonefile_hash: Option<String>,
    /// Last transaction touching the name
    #[serde(default)]
    pub last_txid: Option<String>,
    /// Registry status string
    #[serde(default)]
    pub status: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Client for the registry API
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: HttpClient,
    base_url: String,
}

impl RegistryClient {
    /// Create a client for the registry at `base_url`
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    /// Registration price of a fully qualified name, in satoshis
    pub async fn get_name_price(&self, name: &str) -> Result<u64> {
        let url = join_url(&self.base_url, &format!("v1/prices/names/{}", name));
        let price: NamePriceResponse = self.http.get_json(&url).await?;
        debug!(name, satoshis = price.name_price.satoshis, "name price");
        Ok(price.name_price.satoshis)
    }

    /// Price of a namespace, in satoshis
    pub async fn get_namespace_price(&self, namespace_id: &str) -> Result<u64> {
        let url = join_url(&self.base_url, &format!("v1/prices/namespaces/{}", namespace_id));
        let price: Satoshis = self.http.get_json(&url).await?;
        debug!(namespace_id, satoshis = price.satoshis, "namespace price");
        Ok(price.satoshis)
    }

    /// Namespace record
    pub async fn get_namespace_info(&self, namespace_id: &str) -> Result<NamespaceInfo> {
        let url = join_url(&self.base_url, &format!("v1/namespaces/{}", namespace_id));
        self.get_or_not_found(&url, &format!("namespace {}", namespace_id)).await
    }

    /// Current consensus hash as 32 hex characters
    pub async fn get_consensus_hash(&self) -> Result<String> {
        let url = join_url(&self.base_url, "v1/blockchains/bitcoin/consensus");
        let response: ConsensusResponse = self.http.get_json(&url).await?;
        Ok(response.consensus_hash)
    }

    /// Name record
    pub async fn get_name_info(&self, name: &str) -> Result<NameInfo> {
        let url = join_url(&self.base_url, &format!("v1/names/{}", name));
        self.get_or_not_found(&url, &format!("name {}", name)).await
    }

    /// Names owned by `address`
    pub async fn get_names_owned(&self, address: &str) -> Result<Vec<String>> {
        let url = join_url(&self.base_url, &format!("v1/addresses/bitcoin/{}", address));
        let response: NamesOwnedResponse = self.http.get_json(&url).await?;
        Ok(response.names)
    }

    /// Submit a zone file for ingestion
    pub async fn broadcast_zone_file(&self, zone_file: &str) -> Result<BroadcastAck> {
        let url = join_url(&self.base_url, "v1/zonefile/");
        let response = self.http.post_json(&url, &json!({ "zonefile": zone_file })).await?;
        acknowledge(&url, response).await
    }

    async fn get_or_not_found<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let response = self.http.get(url).await?;
        if response.status().as_u16() == 404 {
            return Err(Error::NotFound(what.to_string()));
        }
        decode_json(url, ensure_success(url, response).await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_burn_address() {
        let info: NamespaceInfo = serde_json::from_value(json!({
            "history": {
                "10": [{ "burn_address": "15GAGiT2j2F1EzZrvjk3B8vBCfwVEzQaZx" }],
                "9": [{ "burn_address": "1111111111111111111114oLvT2" }],
                "12": [{ "op": "+" }]
            }
        }))
        .unwrap();

        assert_eq!(
            info.latest_burn_address().as_deref(),
            Some("15GAGiT2j2F1EzZrvjk3B8vBCfwVEzQaZx")
        );
    }

    #[test]
    fn test_no_burn_address_in_history() {
        let info: NamespaceInfo =
            serde_json::from_value(json!({ "version": 2, "reveal_block": 100, "history": {} }))
                .unwrap();
        assert_eq!(info.latest_burn_address(), None);
        assert_eq!(info.version, Some(2));
    }

    #[test]
    fn test_name_info_accepts_expires_block() {
        let info: NameInfo = serde_json::from_value(json!({ "expires_block": 50 })).unwrap();
        assert_eq!(info.expire_block, Some(50));
    }
}
