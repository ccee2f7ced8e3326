//! UTXO (Unspent Transaction Output) records.
//!
//! Every backend normalizes its response into [`Utxo`] before it reaches
//! funding or the overlay cache.

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Represents an unspent transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction ID containing this output
    pub txid: Txid,
    /// Output index within the transaction
    pub vout: u32,
    /// Value in satoshis
    pub value: u64,
    /// Confirmations reported by the backend (zero for overlay outputs)
    pub confirmations: u32,
}

impl Utxo {
    /// Create a new UTXO
    pub fn new(txid: Txid, vout: u32, value: u64, confirmations: u32) -> Self {
        Self {
            txid,
            vout,
            value,
            confirmations,
        }
    }

    /// Get the outpoint for this UTXO
    pub fn outpoint(&self) -> OutPoint {
        OutPoint { txid: self.txid, vout: self.vout }
    }

    /// Check if UTXO has at least `min_confirmations`
    pub fn is_confirmed(&self, min_confirmations: u32) -> bool {
        self.confirmations >= min_confirmations
    }
}

/// UTXO ordering applied before funding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Largest UTXOs first (minimizes number of inputs)
    #[default]
    LargestFirst,
    /// Smallest UTXOs first (consolidates dust)
    SmallestFirst,
    /// Keep the order the backend returned
    AsReturned,
}

impl SelectionStrategy {
    /// Order `utxos` in place; ties keep their original order
    pub fn apply(self, utxos: &mut [Utxo]) {
        match self {
            SelectionStrategy::LargestFirst => utxos.sort_by(|a, b| b.value.cmp(&a.value)),
            SelectionStrategy::SmallestFirst => utxos.sort_by(|a, b| a.value.cmp(&b.value)),
            SelectionStrategy::AsReturned => {}
        }
    }
}

/// Parse a big-endian transaction ID as reported by block explorers
pub fn parse_txid(value: &str) -> Result<Txid> {
    Txid::from_str(value).map_err(|e| Error::Deserialization(format!("txid {:?}: {}", value, e)))
}

/// Total value of a slice of UTXOs
pub fn total_value(utxos: &[Utxo]) -> u64 {
    utxos.iter().map(|u| u.value).sum()
}

/// Drop repeated outpoints, keeping the first occurrence
pub fn dedup_by_outpoint(utxos: Vec<Utxo>) -> Vec<Utxo> {
    let mut seen = HashSet::new();
    utxos
        .into_iter()
        .filter(|u| seen.insert(u.outpoint()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_txid(n: u8) -> Txid {
        Txid::from_str(&format!("{:064x}", n)).unwrap()
    }

    #[test]
    fn test_utxo_creation() {
        let utxo = Utxo::new(test_txid(1), 0, 100_000, 3);

        assert_eq!(utxo.value, 100_000);
        assert!(utxo.is_confirmed(1));
        assert!(!utxo.is_confirmed(6));
        assert_eq!(utxo.outpoint().vout, 0);
    }

    #[test]
    fn test_selection_strategy_ordering() {
        let mut utxos = vec![
            Utxo::new(test_txid(1), 0, 10_000, 1),
            Utxo::new(test_txid(2), 0, 50_000, 1),
            Utxo::new(test_txid(3), 0, 10_000, 1),
        ];

        SelectionStrategy::LargestFirst.apply(&mut utxos);
        assert_eq!(utxos[0].value, 50_000);
        assert_eq!(utxos[1].txid, test_txid(1));
        assert_eq!(utxos[2].txid, test_txid(3));

        SelectionStrategy::SmallestFirst.apply(&mut utxos);
        assert_eq!(utxos[2].value, 50_000);
        assert_eq!(total_value(&utxos), 70_000);
    }

    #[test]
    fn test_as_returned_keeps_backend_order() {
        let mut utxos = vec![
            Utxo::new(test_txid(1), 0, 10_000, 1),
            Utxo::new(test_txid(2), 0, 50_000, 1),
            Utxo::new(test_txid(3), 0, 20_000, 1),
        ];

        SelectionStrategy::AsReturned.apply(&mut utxos);
        let order: Vec<_> = utxos.iter().map(|u| u.txid).collect();
        assert_eq!(order, vec![test_txid(1), test_txid(2), test_txid(3)]);
    }

    #[test]
    fn test_dedup_by_outpoint() {
        let utxos = vec![
            Utxo::new(test_txid(1), 0, 10_000, 1),
            Utxo::new(test_txid(1), 0, 10_000, 0),
            Utxo::new(test_txid(1), 1, 20_000, 0),
        ];
        let unique = dedup_by_outpoint(utxos);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].confirmations, 1);
    }

    #[test]
    fn test_parse_txid() {
        let txid = parse_txid(
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
        )
        .unwrap();
        assert_eq!(
            txid.to_string(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
        assert_eq!(parse_txid("bar").unwrap_err().code(), "deserialization_error");
    }
}
