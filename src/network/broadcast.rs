//! Broadcast relay client and routing.
//!
//! Submissions that should wait for another transaction to confirm go
//! through the relay service; everything else is pushed straight to the
//! UTXO backend or the registry.

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::network::http::{acknowledge, join_url, BroadcastAck, HttpClient};
use crate::network::provider::UtxoBackend;
use crate::network::registry::RegistryClient;

// ═══════════════════════════════════════════════════════════════════════════════
// RELAY CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest<'a> {
    transaction: &'a str,
    transaction_to_watch: &'a str,
    confirmations: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZoneFileRequest<'a> {
    zone_file: &'a str,
    transaction_to_watch: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequest<'a> {
    preorder_transaction: &'a str,
    register_transaction: &'a str,
    zone_file: &'a str,
}

/// Client for the broadcast relay service
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: HttpClient,
    base_url: String,
}

impl RelayClient {
    /// Create a client for the relay at `base_url`
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    /// Queue `transaction` until `watch` has `confirmations` confirmations
    pub async fn broadcast_transaction(
        &self,
        transaction: &str,
        watch: &str,
        confirmations: u32,
    ) -> Result<BroadcastAck> {
        let url = join_url(&self.base_url, "v1/broadcast/transaction");
        let body = TransactionRequest {
            transaction,
            transaction_to_watch: watch,
            confirmations,
        };
        acknowledge(&url, self.http.post_json(&url, &body).await?).await
    }

    /// Queue a zone file until `watch` confirms
    pub async fn broadcast_zone_file(&self, zone_file: &str, watch: &str) -> Result<BroadcastAck> {
        let url = join_url(&self.base_url, "v1/broadcast/zone-file");
        let body = ZoneFileRequest {
            zone_file,
            transaction_to_watch: watch,
        };
        acknowledge(&url, self.http.post_json(&url, &body).await?).await
    }

    /// Hand over a complete preorder/register/zone-file sequence
    pub async fn broadcast_registration(
        &self,
        preorder_transaction: &str,
        register_transaction: &str,
        zone_file: &str,
    ) -> Result<BroadcastAck> {
        let url = join_url(&self.base_url, "v1/broadcast/registration");
        let body = RegistrationRequest {
            preorder_transaction,
            register_transaction,
            zone_file,
        };
        acknowledge(&url, self.http.post_json(&url, &body).await?).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Picks the service each submission goes to.
///
/// Empty strings count as missing arguments and are rejected before any
/// request is made.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastRouter<'a> {
    relay: &'a RelayClient,
    utxo: &'a UtxoBackend,
    registry: &'a RegistryClient,
    default_confirmations: u32,
}

impl<'a> BroadcastRouter<'a> {
    /// Create a router over the given services
    pub fn new(
        relay: &'a RelayClient,
        utxo: &'a UtxoBackend,
        registry: &'a RegistryClient,
        default_confirmations: u32,
    ) -> Self {
        Self {
            relay,
            utxo,
            registry,
            default_confirmations,
        }
    }

    /// Broadcast a raw transaction.
    ///
    /// With a watch target the relay holds it until `watch` has
    /// `confirmations` confirmations (default from configuration);
    /// otherwise it is pushed directly to the UTXO backend.
    pub async fn broadcast_transaction(
        &self,
        raw_hex: &str,
        watch: Option<&str>,
        confirmations: Option<u32>,
    ) -> Result<BroadcastAck> {
        require("transaction", raw_hex)?;

        match watch.filter(|w| !w.is_empty()) {
            Some(watch) => {
                let confirmations = confirmations.unwrap_or(self.default_confirmations);
                info!(watch, confirmations, "relaying transaction");
                self.relay.broadcast_transaction(raw_hex, watch, confirmations).await
            }
            None => {
                info!("pushing transaction to UTXO backend");
                self.utxo.broadcast_transaction(raw_hex).await
            }
        }
    }

    /// Broadcast a zone file, through the relay when `watch` is given
    pub async fn broadcast_zone_file(&self, zone_file: &str, watch: Option<&str>) -> Result<BroadcastAck> {
        require("zoneFile", zone_file)?;

        match watch.filter(|w| !w.is_empty()) {
            Some(watch) => {
                info!(watch, "relaying zone file");
                self.relay.broadcast_zone_file(zone_file, watch).await
            }
            None => {
                info!("submitting zone file to registry");
                self.registry.broadcast_zone_file(zone_file).await
            }
        }
    }

    /// Hand a full name registration to the relay
    pub async fn broadcast_name_registration(
        &self,
        preorder_transaction: &str,
        register_transaction: &str,
        zone_file: &str,
    ) -> Result<BroadcastAck> {
        require("preorderTransaction", preorder_transaction)?;
        require("registerTransaction", register_transaction)?;
        require("zoneFile", zone_file)?;

        info!("relaying name registration");
        self.relay
            .broadcast_registration(preorder_transaction, register_transaction, zone_file)
            .await
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::missing(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_bodies_use_wire_names() {
        let body = serde_json::to_value(TransactionRequest {
            transaction: "abc",
            transaction_to_watch: "def",
            confirmations: 6,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"transaction": "abc", "transactionToWatch": "def", "confirmations": 6})
        );

        let body = serde_json::to_value(RegistrationRequest {
            preorder_transaction: "abc",
            register_transaction: "123",
            zone_file: "$ORIGIN satoshi.id",
        })
        .unwrap();
        assert_eq!(body["preorderTransaction"], "abc");
        assert_eq!(body["registerTransaction"], "123");
        assert_eq!(body["zoneFile"], "$ORIGIN satoshi.id");
    }

    #[test]
    fn test_require() {
        assert!(require("zoneFile", "x").is_ok());
        assert_eq!(require("zoneFile", "").unwrap_err(), Error::missing("zoneFile"));
    }
}
