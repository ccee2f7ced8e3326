//! Transaction drafts for protocol operations.
//!
//! A [`TxDraft`] keeps inputs and outputs in insertion order, which is part
//! of the protocol contract: outputs are never reordered. Each input
//! remembers the UTXO it spends so input totals are known without a lookup.

use bitcoin::hashes::Hash;
use bitcoin::script::{Builder as ScriptBuilder, PushBytesBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{
    absolute::LockTime, transaction::Version, Address, Amount, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, Txid, Witness,
};

use crate::btc::fees::{estimate_tx_bytes, FeeRate};
use crate::btc::utxo::Utxo;
use crate::error::{Error, Result};
use crate::utils::crypto::PaymentKey;

/// An unsigned transaction under construction
#[derive(Debug, Clone)]
pub struct TxDraft {
    tx: Transaction,
    spent: Vec<Utxo>,
}

impl TxDraft {
    /// Create an empty version-1 draft
    pub fn new() -> Self {
        Self {
            tx: Transaction {
                version: Version::ONE,
                lock_time: LockTime::ZERO,
                input: Vec::new(),
                output: Vec::new(),
            },
            spent: Vec::new(),
        }
    }

    /// Append an input spending `utxo`; returns its index
    pub fn add_input(&mut self, utxo: &Utxo) -> usize {
        self.tx.input.push(TxIn {
            previous_output: utxo.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        });
        self.spent.push(utxo.clone());
        self.tx.input.len() - 1
    }

    /// Append an output; returns its index
    pub fn add_output(&mut self, script_pubkey: ScriptBuf, value: u64) -> usize {
        self.tx.output.push(TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        });
        self.tx.output.len() - 1
    }

    /// Append an output paying `address`; returns its index
    pub fn add_output_to(&mut self, address: &Address, value: u64) -> usize {
        self.add_output(address.script_pubkey(), value)
    }

    /// Value of the output at `index`
    pub fn output_value(&self, index: usize) -> Result<u64> {
        self.tx
            .output
            .get(index)
            .map(|o| o.value.to_sat())
            .ok_or_else(|| Error::Internal(format!("no output at index {}", index)))
    }

    /// Overwrite the value of the output at `index`
    pub fn set_output_value(&mut self, index: usize, value: u64) -> Result<()> {
        let output = self
            .tx
            .output
            .get_mut(index)
            .ok_or_else(|| Error::Internal(format!("no output at index {}", index)))?;
        output.value = Amount::from_sat(value);
        Ok(())
    }

    /// Number of inputs
    pub fn input_count(&self) -> usize {
        self.tx.input.len()
    }

    /// Number of outputs
    pub fn output_count(&self) -> usize {
        self.tx.output.len()
    }

    /// UTXOs spent by this draft, in input order
    pub fn spent(&self) -> &[Utxo] {
        &self.spent
    }

    /// Sum of the values of all spent UTXOs
    pub fn total_input(&self) -> u64 {
        self.spent.iter().map(|u| u.value).sum()
    }

    /// Sum of all output values
    pub fn total_output(&self) -> u64 {
        self.tx.output.iter().map(|o| o.value.to_sat()).sum()
    }

    /// Predicted signed size with additional unsigned inputs and outputs
    pub fn estimate_bytes(&self, extra_inputs: usize, extra_outputs: usize) -> u64 {
        estimate_tx_bytes(&self.tx, extra_inputs, extra_outputs)
    }

    /// Fee for the draft at `rate`, including additional inputs and outputs
    pub fn fee_at(&self, rate: FeeRate, extra_inputs: usize, extra_outputs: usize) -> u64 {
        rate.fee_for_bytes(self.estimate_bytes(extra_inputs, extra_outputs))
    }

    /// The transaction as built so far
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Sign every input with P2PKH scriptSigs.
    ///
    /// `signer_for(index)` picks the key for each input; the key's own
    /// address is taken as the spent output's locking script.
    pub fn sign<'k, F>(mut self, signer_for: F) -> Result<SignedTx>
    where
        F: Fn(usize) -> &'k PaymentKey,
    {
        let sighash_type = EcdsaSighashType::All;

        let script_sigs = {
            let cache = SighashCache::new(&self.tx);
            (0..self.tx.input.len())
                .map(|index| {
                    let key = signer_for(index);
                    let sighash = cache
                        .legacy_signature_hash(index, &key.script_pubkey(), sighash_type.to_u32())
                        .map_err(|e| Error::CryptoError {
                            operation: "legacy_sighash".into(),
                            details: e.to_string(),
                        })?;

                    let signature = bitcoin::ecdsa::Signature {
                        signature: key.sign_digest(sighash.to_byte_array()),
                        sighash_type,
                    };
                    let sig_push = PushBytesBuf::try_from(signature.to_vec())
                        .map_err(|e| Error::Serialization(e.to_string()))?;

                    Ok(ScriptBuilder::new()
                        .push_slice(sig_push)
                        .push_key(key.public_key())
                        .into_script())
                })
                .collect::<Result<Vec<ScriptBuf>>>()?
        };

        for (input, script_sig) in self.tx.input.iter_mut().zip(script_sigs) {
            input.script_sig = script_sig;
        }

        Ok(SignedTx {
            tx: self.tx,
            spent: self.spent,
        })
    }
}

impl Default for TxDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully signed transaction ready for broadcast
#[derive(Debug, Clone)]
pub struct SignedTx {
    tx: Transaction,
    spent: Vec<Utxo>,
}

impl SignedTx {
    /// Transaction ID
    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    /// Raw serialized transaction as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(bitcoin::consensus::serialize(&self.tx))
    }

    /// Serialized length in bytes
    pub fn size(&self) -> usize {
        bitcoin::consensus::serialize(&self.tx).len()
    }

    /// Fee paid: inputs minus outputs
    pub fn fee(&self) -> u64 {
        let outputs: u64 = self.tx.output.iter().map(|o| o.value.to_sat()).sum();
        self.spent.iter().map(|u| u.value).sum::<u64>().saturating_sub(outputs)
    }

    /// The signed transaction
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Consume into the signed transaction
    pub fn into_transaction(self) -> Transaction {
        self.tx
    }
}

/// Parse a raw hex transaction
pub fn decode_tx_hex(raw: &str) -> Result<Transaction> {
    let bytes = hex::decode(raw).map_err(|e| Error::Deserialization(e.to_string()))?;
    bitcoin::consensus::deserialize(&bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Network;
    use std::str::FromStr;

    fn test_txid(n: u8) -> Txid {
        Txid::from_str(&format!("{:064x}", n)).unwrap()
    }

    fn test_key() -> PaymentKey {
        PaymentKey::from_hex(
            "744196d67ed78fe39009c71fbfd53e6ecca98353fbfe81ccba21b0703a69be9c01",
            Network::Bitcoin,
        )
        .unwrap()
    }

    #[test]
    fn test_draft_creation() {
        let key = test_key();
        let mut draft = TxDraft::new();

        draft.add_input(&Utxo::new(test_txid(1), 0, 100_000, 1));
        let idx = draft.add_output_to(key.address(), 50_000);
        draft.add_output(ScriptBuf::new(), 0);

        assert_eq!(idx, 0);
        assert_eq!(draft.input_count(), 1);
        assert_eq!(draft.output_count(), 2);
        assert_eq!(draft.total_input(), 100_000);
        assert_eq!(draft.total_output(), 50_000);
    }

    #[test]
    fn test_set_output_value() {
        let key = test_key();
        let mut draft = TxDraft::new();
        let idx = draft.add_output_to(key.address(), 5_500);

        draft.set_output_value(idx, 7_000).unwrap();
        assert_eq!(draft.output_value(idx).unwrap(), 7_000);
        assert!(draft.set_output_value(3, 1).is_err());
    }

    #[test]
    fn test_signed_size_matches_estimate() {
        let key = test_key();
        let mut draft = TxDraft::new();
        for n in 1..=3 {
            draft.add_input(&Utxo::new(test_txid(n), 0, 100_000, 1));
        }
        draft.add_output_to(key.address(), 150_000);
        draft.add_output_to(key.address(), 100_000);

        let estimate = draft.estimate_bytes(0, 0);
        let signed = draft.sign(|_| &key).unwrap();
        let actual = signed.size() as u64;

        assert!(estimate >= actual && estimate <= actual + 5, "{} vs {}", estimate, actual);
        assert_eq!(signed.fee(), 50_000);
        assert_eq!(signed.to_hex().len(), signed.size() * 2);
    }

    #[test]
    fn test_signature_verifies() {
        let key = test_key();
        let mut draft = TxDraft::new();
        draft.add_input(&Utxo::new(test_txid(9), 1, 20_000, 1));
        draft.add_output_to(key.address(), 10_000);
        let unsigned = draft.transaction().clone();

        let signed = draft.sign(|_| &key).unwrap();
        let script_sig = &signed.transaction().input[0].script_sig;
        let pushes: Vec<Vec<u8>> = script_sig
            .instructions()
            .filter_map(|i| match i {
                Ok(bitcoin::script::Instruction::PushBytes(b)) => Some(b.as_bytes().to_vec()),
                _ => None,
            })
            .collect();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1], key.public_key().to_bytes());

        let sig = bitcoin::ecdsa::Signature::from_slice(&pushes[0]).unwrap();
        let sighash = SighashCache::new(&unsigned)
            .legacy_signature_hash(0, &key.script_pubkey(), EcdsaSighashType::All.to_u32())
            .unwrap();
        let msg = secp256k1::Message::from_digest(sighash.to_byte_array());
        let secp = secp256k1::Secp256k1::verification_only();
        assert!(secp.verify_ecdsa(&msg, &sig.signature, &key.public_key().inner).is_ok());
    }

    #[test]
    fn test_decode_tx_hex_rejects_garbage() {
        assert!(decode_tx_hex("zz").is_err());
        assert!(decode_tx_hex("0100").is_err());
    }
}
