//! Legacy blockchain.info unspent-outputs backend.

use serde::Deserialize;
use tracing::debug;

use crate::btc::utxo::{parse_txid, Utxo};
use crate::error::{Error, Result};
use crate::network::http::{
    acknowledge, decode_json, ensure_success, join_url, BroadcastAck, HttpClient,
};
use crate::network::TransactionInfo;

#[derive(Debug, Deserialize)]
struct UnspentResponse {
    #[serde(default)]
    unspent_outputs: Vec<UnspentOutput>,
}

#[derive(Debug, Deserialize)]
struct UnspentOutput {
    tx_hash_big_endian: String,
    tx_output_n: u32,
    value: u64,
    #[serde(default)]
    confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    height: u64,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    #[serde(default)]
    block_height: Option<u64>,
}

/// Client for the blockchain.info public API
#[derive(Debug, Clone)]
pub struct BlockchainInfoClient {
    http: HttpClient,
    base_url: String,
}

impl BlockchainInfoClient {
    /// Create a client for the API at `base_url`
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    /// Base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Unspent outputs of `address`.
    ///
    /// The service answers 500 for addresses it has never seen; that is
    /// reported as an empty set.
    pub async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let url = join_url(
            &self.base_url,
            &format!("unspent?format=json&active={}&cors=true", address),
        );
        let response = self.http.get(&url).await?;
        if response.status().as_u16() == 500 {
            debug!(address, "no unspent outputs known");
            return Ok(Vec::new());
        }

        let raw: UnspentResponse = decode_json(&url, ensure_success(&url, response).await?).await?;

        let utxos = raw
            .unspent_outputs
            .into_iter()
            .map(|u| {
                Ok(Utxo::new(
                    parse_txid(&u.tx_hash_big_endian)?,
                    u.tx_output_n,
                    u.value,
                    u.confirmations,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(address, count = utxos.len(), "blockchain.info UTXOs");
        Ok(utxos)
    }

    /// Current chain height
    pub async fn get_block_height(&self) -> Result<u64> {
        let url = join_url(&self.base_url, "latestblock?cors=true");
        let block: LatestBlock = self.http.get_json(&url).await?;
        Ok(block.height)
    }

    /// Confirmation height of a transaction; `None` while unconfirmed
    pub async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        let url = join_url(&self.base_url, &format!("rawtx/{}?cors=true", txid));
        let response = self.http.get(&url).await?;
        if response.status().as_u16() == 404 {
            return Err(Error::NotFound(format!("transaction {}", txid)));
        }

        let tx: RawTx = decode_json(&url, ensure_success(&url, response).await?).await?;
        Ok(TransactionInfo { block_height: tx.block_height })
    }

    /// Push a raw transaction through the form endpoint
    pub async fn broadcast_transaction(&self, raw_hex: &str) -> Result<BroadcastAck> {
        let url = join_url(&self.base_url, "pushtx?cors=true");
        let response = self.http.post_form_field(&url, "tx", raw_hex).await?;
        acknowledge(&url, response).await
    }
}
