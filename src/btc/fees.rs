//! Fee rates and pre-signing size estimation.
//!
//! Fees are always `bytes × sat/byte`. Sizes are predicted from the
//! transaction as built so far: inputs that already carry a scriptSig are
//! counted exactly, unsigned inputs are counted as signed P2PKH inputs.

use bitcoin::Transaction;
use serde::{Deserialize, Serialize};

use crate::utils::constants::tx_size;

/// Fee rate in satoshis per byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate(u64);

impl FeeRate {
    /// Minimum relay fee (1 sat/B)
    pub const MIN: Self = Self(1);

    /// Create from sat/B
    pub fn from_sat_per_byte(rate: u64) -> Self {
        Self(rate.max(1))
    }

    /// Create from a per-kilobyte recommendation
    pub fn from_sat_per_kb(rate: u64) -> Self {
        Self::from_sat_per_byte(rate / 1000)
    }

    /// Get rate as sat/B
    pub fn sat_per_byte(&self) -> u64 {
        self.0
    }

    /// Calculate fee for a given byte length
    pub fn fee_for_bytes(&self, bytes: u64) -> u64 {
        self.0.saturating_mul(bytes)
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self(10)
    }
}

/// Serialized size of a Bitcoin compact-size integer
pub fn compact_size_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Predict the signed, serialized byte length of `tx`.
///
/// `extra_inputs` adds unsigned P2PKH inputs and `extra_outputs` adds
/// standard P2PKH outputs that are not yet part of the transaction.
pub fn estimate_tx_bytes(tx: &Transaction, extra_inputs: usize, extra_outputs: usize) -> u64 {
    let input_count = (tx.input.len() + extra_inputs) as u64;
    let output_count = (tx.output.len() + extra_outputs) as u64;

    let inputs: u64 = tx
        .input
        .iter()
        .map(|input| {
            let script_len = input.script_sig.len() as u64;
            if script_len == 0 {
                tx_size::TX_P2PKH_INPUT
            } else {
                tx_size::TX_OUTPOINT_AND_SEQUENCE + compact_size_len(script_len) + script_len
            }
        })
        .sum();

    let outputs: u64 = tx
        .output
        .iter()
        .map(|output| {
            let script_len = output.script_pubkey.len() as u64;
            tx_size::TX_OUTPUT_VALUE + compact_size_len(script_len) + script_len
        })
        .sum();

    tx_size::TX_VERSION_AND_LOCKTIME
        + compact_size_len(input_count)
        + compact_size_len(output_count)
        + inputs
        + tx_size::TX_P2PKH_INPUT * extra_inputs as u64
        + outputs
        + tx_size::TX_P2PKH_OUTPUT * extra_outputs as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::ScriptBuf;
    use proptest::prelude::*;

    const SIGNED_TX_HEX: &str = concat!(
        "010000000288e68977fab8038af07746e5d687652a44aa15f532509c202749d",
        "bad8a418733000000006b483045022100813ef3534b5030b544e5a5bd1db93f85dc89e2",
        "a565197a14784edff5564bd65b022008005213c6aa4c7ebe06cfd86bdaf3e662ae58371",
        "896a0a841e81106fbe1507401210236b07942707a86ab666bb300b58d295d988ce9c3a3",
        "38a0e08380dd98732fd4faffffffff3ba3edfd7a7b12b27ac72c3e67768f617fc81bc38",
        "88a51323a9fb8aa4b1e5e4a000000006b483045022100d0c9b1594137186a1dc6c0b3a6",
        "cbe08399b57e2b8c953584f2ce20bef5642eb902206b9c88b8d2d311db26601acf3068d",
        "d118649ead4a1f93d029a52c0c61cb2cd2901210236b07942707a86ab666bb300b58d29",
        "5d988ce9c3a338a0e08380dd98732fd4faffffffff030000000000000000296a2769643",
        "f363da95bc8d5203d1c07bd87c564a1e6395826cfdfe87cfd31ffa2a3b8101e3e93096f",
        "2b7c150000000000001976a91441577ec99314a293acbc17d8152137cf4862f7f188ace",
        "8030000000000001976a9142ebe7b4729185f68c7185c3c6af60fad1b6eeebf88ac00000000",
    );

    fn signed_tx() -> Transaction {
        let bytes = hex::decode(SIGNED_TX_HEX).unwrap();
        bitcoin::consensus::deserialize(&bytes).unwrap()
    }

    fn within_tolerance(estimate: u64, actual: u64) -> bool {
        estimate + 5 >= actual && estimate <= actual + 5
    }

    #[test]
    fn test_fee_calculation() {
        let rate = FeeRate::from_sat_per_byte(10);
        assert_eq!(rate.fee_for_bytes(100), 1000);
        assert_eq!(FeeRate::from_sat_per_byte(0), FeeRate::MIN);
        assert_eq!(FeeRate::from_sat_per_kb(1_000_000).sat_per_byte(), 1000);
        assert_eq!(FeeRate::from_sat_per_kb(999).sat_per_byte(), 1);
    }

    #[test]
    fn test_signed_inputs_are_counted_exactly() {
        let tx = signed_tx();
        let actual = (SIGNED_TX_HEX.len() / 2) as u64;
        assert_eq!(estimate_tx_bytes(&tx, 0, 0), actual);
    }

    #[test]
    fn test_unsigned_estimate_within_tolerance() {
        let mut tx = signed_tx();
        let actual = (SIGNED_TX_HEX.len() / 2) as u64;
        for input in tx.input.iter_mut() {
            input.script_sig = ScriptBuf::new();
        }
        assert!(within_tolerance(estimate_tx_bytes(&tx, 0, 0), actual));
    }

    #[test]
    fn test_extra_inputs_and_outputs_within_tolerance() {
        let signed = signed_tx();
        let actual = (SIGNED_TX_HEX.len() / 2) as u64;

        let skeleton = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![signed.output[0].clone()],
        };
        assert!(within_tolerance(estimate_tx_bytes(&skeleton, 2, 2), actual));
    }

    #[test]
    fn test_empty_transaction() {
        let tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![],
        };
        assert_eq!(estimate_tx_bytes(&tx, 0, 0), tx_size::TX_EMPTY_SIZE);
    }

    #[test]
    fn test_compact_size_len() {
        assert_eq!(compact_size_len(0xfc), 1);
        assert_eq!(compact_size_len(0xfd), 3);
        assert_eq!(compact_size_len(0x1_0000), 5);
        assert_eq!(compact_size_len(u64::MAX), 9);
    }

    proptest! {
        #[test]
        fn prop_each_extra_input_costs_one_p2pkh_input(ins in 0usize..20, outs in 0usize..20) {
            let tx = Transaction {
                version: Version::ONE,
                lock_time: LockTime::ZERO,
                input: vec![],
                output: vec![],
            };
            let base = estimate_tx_bytes(&tx, ins, outs);
            prop_assert_eq!(estimate_tx_bytes(&tx, ins + 1, outs) - base, tx_size::TX_P2PKH_INPUT);
            prop_assert_eq!(estimate_tx_bytes(&tx, ins, outs + 1) - base, tx_size::TX_P2PKH_OUTPUT);
        }
    }
}
