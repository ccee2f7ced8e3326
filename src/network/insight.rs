//! Insight-style REST UTXO backend.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::btc::utxo::{parse_txid, Utxo};
use crate::error::{Error, Result};
use crate::network::http::{acknowledge, decode_json, ensure_success, join_url, BroadcastAck, HttpClient};
use crate::network::TransactionInfo;

#[derive(Debug, Deserialize)]
struct InsightUtxo {
    txid: String,
    vout: u32,
    satoshis: u64,
    #[serde(default)]
    confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct InsightStatus {
    blocks: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightTx {
    #[serde(default)]
    block_hash: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct InsightBlock {
    height: u64,
}

/// Client for an Insight API server
#[derive(Debug, Clone)]
pub struct InsightClient {
    http: HttpClient,
    base_url: String,
}

impl InsightClient {
    /// Create a client for the server at `base_url`
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Unspent outputs of `address` as reported by the server
    pub async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let url = join_url(&self.base_url, &format!("addr/{}/utxo", address));
        let raw: Vec<InsightUtxo> = self.http.get_json(&url).await?;

        let utxos = raw
            .into_iter()
            .map(|u| Ok(Utxo::new(parse_txid(&u.txid)?, u.vout, u.satoshis, u.confirmations)))
            .collect::<Result<Vec<_>>>()?;

        debug!(address, count = utxos.len(), "insight UTXOs");
        Ok(utxos)
    }

    /// Current chain height
    pub async fn get_block_height(&self) -> Result<u64> {
        let url = join_url(&self.base_url, "status");
        let status: InsightStatus = self.http.get_json(&url).await?;
        Ok(status.blocks)
    }

    /// Confirmation height of a transaction; `None` while unconfirmed
    pub async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        let url = join_url(&self.base_url, &format!("tx/{}", txid));
        let response = self.http.get(&url).await?;

        let status = response.status().as_u16();
        if status == 400 || status == 404 {
            return Err(Error::NotFound(format!("transaction {}", txid)));
        }

        let tx: InsightTx = decode_json(&url, ensure_success(&url, response).await?).await?;
        if tx.error.is_some() {
            return Err(Error::NotFound(format!("transaction {}", txid)));
        }

        let block_height = match tx.block_hash {
            Some(hash) => {
                let url = join_url(&self.base_url, &format!("block/{}", hash));
                let block: InsightBlock = self.http.get_json(&url).await?;
                Some(block.height)
            }
            None => None,
        };

        Ok(TransactionInfo { block_height })
    }

    /// Push a raw transaction
    pub async fn broadcast_transaction(&self, raw_hex: &str) -> Result<BroadcastAck> {
        let url = join_url(&self.base_url, "tx/send");
        let response = self.http.post_json(&url, &json!({ "rawtx": raw_hex })).await?;
        acknowledge(&url, response).await
    }
}
