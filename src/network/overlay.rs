//! Local overlay of unconfirmed spends.
//!
//! Backends lag behind freshly signed transactions. The overlay remembers
//! which outpoints such a transaction consumed and which outputs it created,
//! and applies that delta on top of every backend UTXO response until the
//! caller resets the affected addresses.

use bitcoin::script::Instruction;
use bitcoin::{Address, Network, OutPoint, PublicKey, Script, Transaction, Txid};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

use crate::btc::scripts::address_from_script;
use crate::btc::tx_builder::decode_tx_hex;
use crate::btc::utxo::{dedup_by_outpoint, Utxo};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct OverlayState {
    /// Spent outpoints keyed by the address whose key signed them
    consumed: HashMap<String, HashSet<OutPoint>>,
    /// Spent outpoints whose owner could not be read from the scriptSig
    unattributed: HashSet<OutPoint>,
    /// Outputs created by overlaid transactions, per receiving address
    added: HashMap<String, Vec<Utxo>>,
}

/// Address-keyed delta over backend UTXO sets
#[derive(Debug)]
pub struct OverlayCache {
    network: Network,
    state: RwLock<OverlayState>,
}

impl OverlayCache {
    /// Create an empty overlay for addresses on `network`
    pub fn new(network: Network) -> Self {
        Self {
            network,
            state: RwLock::new(OverlayState::default()),
        }
    }

    /// Record the effects of a signed raw transaction; returns its txid
    pub fn modify_from(&self, raw_hex: &str) -> Result<Txid> {
        let tx = decode_tx_hex(raw_hex)?;
        self.modify_from_transaction(&tx)?;
        Ok(tx.compute_txid())
    }

    /// Record the effects of a signed transaction
    pub fn modify_from_transaction(&self, tx: &Transaction) -> Result<()> {
        let txid = tx.compute_txid();
        let mut state = self.state.write().map_err(|_| Error::Lock)?;

        for input in &tx.input {
            match spender_address(&input.script_sig, self.network) {
                Some(address) => {
                    state
                        .consumed
                        .entry(address.to_string())
                        .or_default()
                        .insert(input.previous_output);
                }
                None => {
                    state.unattributed.insert(input.previous_output);
                }
            }
        }

        for (vout, output) in tx.output.iter().enumerate() {
            if output.script_pubkey.is_op_return() {
                continue;
            }
            let Some(address) = address_from_script(&output.script_pubkey, self.network) else {
                continue;
            };
            state.added.entry(address.to_string()).or_default().push(Utxo::new(
                txid,
                vout as u32,
                output.value.to_sat(),
                0,
            ));
        }

        debug!(
            %txid,
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            "overlay updated"
        );
        Ok(())
    }

    /// Effective UTXO set of `address` given the backend's `raw` view.
    ///
    /// Backend records come first, overlay additions after; any outpoint
    /// spent by an overlaid transaction is dropped wherever it appears.
    pub fn apply(&self, address: &str, raw: Vec<Utxo>) -> Result<Vec<Utxo>> {
        let state = self.state.read().map_err(|_| Error::Lock)?;

        let mut merged = raw;
        if let Some(added) = state.added.get(address) {
            merged.extend(added.iter().cloned());
        }

        let is_consumed = |outpoint: &OutPoint| {
            state.unattributed.contains(outpoint)
                || state.consumed.values().any(|set| set.contains(outpoint))
        };

        Ok(dedup_by_outpoint(merged)
            .into_iter()
            .filter(|u| !is_consumed(&u.outpoint()))
            .collect())
    }

    /// Forget everything recorded for `address`, plus unattributed spends
    pub fn reset(&self, address: &str) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        state.consumed.remove(address);
        state.added.remove(address);
        state.unattributed.clear();
        debug!(address, "overlay reset");
        Ok(())
    }

    /// True when nothing is recorded
    pub fn is_empty(&self) -> Result<bool> {
        let state = self.state.read().map_err(|_| Error::Lock)?;
        Ok(state.consumed.values().all(HashSet::is_empty)
            && state.unattributed.is_empty()
            && state.added.values().all(Vec::is_empty))
    }
}

/// P2PKH address of the key revealed as the last push of a scriptSig
fn spender_address(script_sig: &Script, network: Network) -> Option<Address> {
    let last_push = script_sig
        .instructions()
        .filter_map(|i| match i {
            Ok(Instruction::PushBytes(bytes)) => Some(bytes.as_bytes().to_vec()),
            _ => None,
        })
        .last()?;

    let public_key = PublicKey::from_slice(&last_push).ok()?;
    Some(Address::p2pkh(public_key.pubkey_hash(), network))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btc::utxo::parse_txid;

    const TX_STARTER_HEX: &str = concat!(
        "01000000013ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323",
        "a9fb8aa4b1e5e4a000000006a473044022050176492b92c79ba",
        "23fb815e62a7778ccb45a50ca11b8dabdbadc1828e6ba34002200ce770",
        "82a072eba8d3ce49e6a316e6173c1f97d955064574fe620cc25002eadb",
        "01210236b07942707a86ab666bb300b58d295d988ce9c3a338a0e08380",
        "dd98732fd4faffffffff030000000000000000296a2769643f363da95b",
        "c8d5203d1c07bd87c564a1e6395826cfdfe87cfd31ffa2a3b8101e3e93",
        "096f2be02c0000000000001976a91441577ec99314a293acbc17d81521",
        "37cf4862f7f188ac39050000000000001976a9142ebe7b4729185f68c7",
        "185c3c6af60fad1b6eeebf88ac00000000",
    );
    const TX_STARTER_ID: &str = "22a024f16944d2f568de4a613566fcfab53b86d37f1903668d399f9a366883de";
    const USED_TX: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
    const ADDRESS_1: &str = "16xVjkJ3nY62B9t9q3N9wY6hx1duAfwRZR";
    const ADDRESS_2: &str = "15GAGiT2j2F1EzZrvjk3B8vBCfwVEzQaZx";

    fn backend_set() -> Vec<Utxo> {
        vec![
            Utxo::new(parse_txid(USED_TX).unwrap(), 0, 287_825, 3),
            Utxo::new(
                parse_txid("3387418aaddb4927209c5032f515aa442a6587d6e54677f08a03b8fa7789e688")
                    .unwrap(),
                0,
                287_825,
                3,
            ),
        ]
    }

    #[test]
    fn test_modify_and_reset() {
        let overlay = OverlayCache::new(Network::Bitcoin);
        let txid = overlay.modify_from(TX_STARTER_HEX).unwrap();
        assert_eq!(txid.to_string(), TX_STARTER_ID);

        let utxos1 = overlay.apply(ADDRESS_1, backend_set()).unwrap();
        let utxos2 = overlay.apply(ADDRESS_2, Vec::new()).unwrap();

        assert_eq!(utxos1.len(), 2);
        assert_eq!(utxos2.len(), 1);
        assert!(utxos1.iter().any(|u| u.txid == txid && u.value == 11_488 && u.confirmations == 0));
        assert!(utxos2.iter().any(|u| u.txid == txid && u.value == 1_337));
        assert!(!utxos1.iter().any(|u| u.txid.to_string() == USED_TX));

        overlay.reset(ADDRESS_1).unwrap();
        overlay.reset(ADDRESS_2).unwrap();
        assert!(overlay.is_empty().unwrap());

        let utxos1 = overlay.apply(ADDRESS_1, backend_set()).unwrap();
        let utxos2 = overlay.apply(ADDRESS_2, Vec::new()).unwrap();
        assert_eq!(utxos1.len(), 2);
        assert_eq!(utxos2.len(), 0);
        assert!(utxos1.iter().any(|u| u.txid.to_string() == USED_TX));
    }

    #[test]
    fn test_spender_attribution() {
        let overlay = OverlayCache::new(Network::Bitcoin);
        overlay.modify_from(TX_STARTER_HEX).unwrap();

        let state = overlay.state.read().unwrap();
        assert!(state.unattributed.is_empty());
        assert_eq!(state.consumed.get(ADDRESS_1).map(HashSet::len), Some(1));
    }

    #[test]
    fn test_reset_is_per_address() {
        let overlay = OverlayCache::new(Network::Bitcoin);
        overlay.modify_from(TX_STARTER_HEX).unwrap();
        overlay.reset(ADDRESS_2).unwrap();

        let utxos1 = overlay.apply(ADDRESS_1, backend_set()).unwrap();
        assert!(!utxos1.iter().any(|u| u.txid.to_string() == USED_TX));
        assert!(overlay.apply(ADDRESS_2, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_hex() {
        let overlay = OverlayCache::new(Network::Bitcoin);
        assert!(overlay.modify_from("not-hex").is_err());
        assert!(overlay.is_empty().unwrap());
    }
}
