//! Bitcoin script helpers.
//!
//! This module provides:
//! - Null-data (OP_RETURN) outputs carrying operation payloads
//! - Address parsing bound to the configured network
//! - Mapping locking scripts back to addresses

use bitcoin::hashes::Hash;
use bitcoin::script::{Builder as ScriptBuilder, Instruction, PushBytesBuf};
use bitcoin::{opcodes, Address, Network, PubkeyHash, Script, ScriptBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::MAX_NULL_DATA_SIZE;

/// OP_RETURN data builder for embedding protocol payloads
pub struct OpReturnBuilder;

impl OpReturnBuilder {
    /// Maximum OP_RETURN data size
    pub const MAX_DATA_SIZE: usize = MAX_NULL_DATA_SIZE;

    /// Build an OP_RETURN script carrying `payload` as a single push
    pub fn build(payload: &[u8]) -> Result<ScriptBuf> {
        if payload.len() > Self::MAX_DATA_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: Self::MAX_DATA_SIZE,
            });
        }

        let push_bytes = PushBytesBuf::try_from(payload.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(ScriptBuilder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_slice(push_bytes)
            .into_script())
    }

    /// Extract the pushed payload from an OP_RETURN script
    pub fn parse(script: &Script) -> Option<Vec<u8>> {
        let mut instructions = script.instructions();

        match instructions.next()? {
            Ok(Instruction::Op(op)) if op == opcodes::all::OP_RETURN => {}
            _ => return None,
        }

        match instructions.next()? {
            Ok(Instruction::PushBytes(bytes)) => Some(bytes.as_bytes().to_vec()),
            _ => None,
        }
    }
}

/// Parse an address string and require it to belong to `network`
pub fn parse_address(name: &str, value: &str, network: Network) -> Result<Address> {
    Address::from_str(value)
        .map_err(|e| Error::invalid(name, e.to_string()))?
        .require_network(network)
        .map_err(|e| Error::invalid(name, e.to_string()))
}

/// Address paid by a locking script, if the script is a standard address type
pub fn address_from_script(script: &Script, network: Network) -> Option<Address> {
    Address::from_script(script, network).ok()
}

/// P2PKH locking script for a raw 20-byte hash
pub fn p2pkh_script_from_hash(hash: [u8; 20]) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash))
}

/// Unspendable burn address (all-zero key hash) on `network`
pub fn default_burn_address(network: Network) -> Address {
    Address::p2pkh(PubkeyHash::from_byte_array([0u8; 20]), network)
}
