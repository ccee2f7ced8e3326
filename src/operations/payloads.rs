//! Operation payload encoding.
//!
//! Every payload is `id` followed by a one-byte operation code and
//! fixed-width fields, and must fit in a single null-data output.

use bitcoin::{Address, Script};
use std::fmt;

use crate::btc::scripts::OpReturnBuilder;
use crate::error::{Error, Result};
use crate::operations::namespace::{validate_namespace_id, NamespaceDefinition};
use crate::utils::codec::{b40_bytes, fixed_hex, hash128, hash160};
use crate::utils::constants::{MAGIC_BYTES, REGISTER_NAME_FIELD_SIZE};

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION CODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Protocol operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Name preorder (`?`)
    Preorder,
    /// Name register and renewal (`:`)
    Register,
    /// Name update (`+`)
    Update,
    /// Name transfer (`>`)
    Transfer,
    /// Name revoke (`~`)
    Revoke,
    /// Namespace preorder (`*`)
    NamespacePreorder,
    /// Namespace reveal (`&`)
    NamespaceReveal,
    /// Namespace ready (`!`)
    NamespaceReady,
    /// Name import (`;`)
    NameImport,
    /// Announcement (`#`)
    Announce,
}

impl OpCode {
    /// All operation codes
    pub const ALL: [OpCode; 10] = [
        OpCode::Preorder,
        OpCode::Register,
        OpCode::Update,
        OpCode::Transfer,
        OpCode::Revoke,
        OpCode::NamespacePreorder,
        OpCode::NamespaceReveal,
        OpCode::NamespaceReady,
        OpCode::NameImport,
        OpCode::Announce,
    ];

    /// Wire byte
    pub fn as_byte(self) -> u8 {
        match self {
            OpCode::Preorder => b'?',
            OpCode::Register => b':',
            OpCode::Update => b'+',
            OpCode::Transfer => b'>',
            OpCode::Revoke => b'~',
            OpCode::NamespacePreorder => b'*',
            OpCode::NamespaceReveal => b'&',
            OpCode::NamespaceReady => b'!',
            OpCode::NameImport => b';',
            OpCode::Announce => b'#',
        }
    }

    /// Operation for a wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_byte() == byte)
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Preorder => "NAME_PREORDER",
            OpCode::Register => "NAME_REGISTRATION",
            OpCode::Update => "NAME_UPDATE",
            OpCode::Transfer => "NAME_TRANSFER",
            OpCode::Revoke => "NAME_REVOKE",
            OpCode::NamespacePreorder => "NAMESPACE_PREORDER",
            OpCode::NamespaceReveal => "NAMESPACE_REVEAL",
            OpCode::NamespaceReady => "NAMESPACE_READY",
            OpCode::NameImport => "NAME_IMPORT",
            OpCode::Announce => "ANNOUNCE",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// A payload read back from a null-data output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    /// Operation
    pub op: OpCode,
    /// Bytes after the magic and operation code
    pub body: Vec<u8>,
}

/// Recognize a protocol payload in a locking script
pub fn parse_payload(script: &Script) -> Option<ParsedPayload> {
    let data = OpReturnBuilder::parse(script)?;
    let rest = data.strip_prefix(MAGIC_BYTES.as_slice())?;
    let (&op_byte, body) = rest.split_first()?;

    Some(ParsedPayload {
        op: OpCode::from_byte(op_byte)?,
        body: body.to_vec(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODERS
// ═══════════════════════════════════════════════════════════════════════════════

fn header(op: OpCode, capacity: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + capacity);
    out.extend_from_slice(MAGIC_BYTES);
    out.push(op.as_byte());
    out
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::missing("name"));
    }
    if name.len() > REGISTER_NAME_FIELD_SIZE {
        return Err(Error::invalid(
            "name",
            format!("{} bytes exceeds {}", name.len(), REGISTER_NAME_FIELD_SIZE),
        ));
    }
    Ok(())
}

/// Commitment hashed into preorders
fn preorder_commitment(id: &str, payer_script: &Script, target: Option<&Address>) -> Result<[u8; 20]> {
    let mut data = b40_bytes(id)?;
    data.extend_from_slice(payer_script.as_bytes());
    if let Some(target) = target {
        data.extend_from_slice(target.to_string().as_bytes());
    }
    Ok(hash160(&data))
}

/// `id?` ‖ hash160(b40(name) ‖ payer script ‖ register address) ‖ consensus hash
pub fn preorder(
    name: &str,
    payer_script: &Script,
    register_address: Option<&Address>,
    consensus_hash: &str,
) -> Result<Vec<u8>> {
    let consensus = fixed_hex::<16>("consensus_hash", consensus_hash)?;
    let mut out = header(OpCode::Preorder, 36);
    out.extend_from_slice(&preorder_commitment(name, payer_script, register_address)?);
    out.extend_from_slice(&consensus);
    Ok(out)
}

/// `id:` ‖ name, zero-padded to 37 bytes when a value hash follows
pub fn register(name: &str, value_hash: Option<&str>) -> Result<Vec<u8>> {
    check_name(name)?;

    let mut out = header(OpCode::Register, REGISTER_NAME_FIELD_SIZE + 20);
    out.extend_from_slice(name.as_bytes());
    if let Some(value_hash) = value_hash {
        let value_hash = fixed_hex::<20>("value_hash", value_hash)?;
        out.resize(3 + REGISTER_NAME_FIELD_SIZE, 0);
        out.extend_from_slice(&value_hash);
    }
    Ok(out)
}

/// `id+` ‖ hash128(name ‖ consensus hash hex) ‖ value hash
pub fn update(name: &str, consensus_hash: &str, value_hash: &str) -> Result<Vec<u8>> {
    check_name(name)?;
    fixed_hex::<16>("consensus_hash", consensus_hash)?;
    let value_hash = fixed_hex::<20>("value_hash", value_hash)?;

    let mut commitment = name.as_bytes().to_vec();
    commitment.extend_from_slice(consensus_hash.as_bytes());

    let mut out = header(OpCode::Update, 36);
    out.extend_from_slice(&hash128(&commitment));
    out.extend_from_slice(&value_hash);
    Ok(out)
}

/// `id>` ‖ `>` or `~` ‖ hash128(name) ‖ consensus hash
pub fn transfer(name: &str, keep_zonefile: bool, consensus_hash: &str) -> Result<Vec<u8>> {
    check_name(name)?;
    let consensus = fixed_hex::<16>("consensus_hash", consensus_hash)?;

    let mut out = header(OpCode::Transfer, 33);
    out.push(if keep_zonefile { b'>' } else { b'~' });
    out.extend_from_slice(&hash128(name.as_bytes()));
    out.extend_from_slice(&consensus);
    Ok(out)
}

/// `id~` ‖ name
pub fn revoke(name: &str) -> Result<Vec<u8>> {
    check_name(name)?;
    let mut out = header(OpCode::Revoke, name.len());
    out.extend_from_slice(name.as_bytes());
    Ok(out)
}

/// `id*` ‖ hash160(b40(namespace) ‖ payer script ‖ reveal address) ‖ consensus hash
pub fn namespace_preorder(
    namespace_id: &str,
    payer_script: &Script,
    reveal_address: &Address,
    consensus_hash: &str,
) -> Result<Vec<u8>> {
    validate_namespace_id(namespace_id)?;
    let consensus = fixed_hex::<16>("consensus_hash", consensus_hash)?;

    let mut out = header(OpCode::NamespacePreorder, 36);
    out.extend_from_slice(&preorder_commitment(namespace_id, payer_script, Some(reveal_address))?);
    out.extend_from_slice(&consensus);
    Ok(out)
}

/// `id&` ‖ packed namespace rules
pub fn namespace_reveal(namespace: &NamespaceDefinition) -> Result<Vec<u8>> {
    let body = namespace.encode()?;
    let mut out = header(OpCode::NamespaceReveal, body.len());
    out.extend_from_slice(&body);
    Ok(out)
}

/// `id!` ‖ `.` ‖ namespace id
pub fn namespace_ready(namespace_id: &str) -> Result<Vec<u8>> {
    validate_namespace_id(namespace_id)?;
    let mut out = header(OpCode::NamespaceReady, namespace_id.len() + 1);
    out.push(b'.');
    out.extend_from_slice(namespace_id.as_bytes());
    Ok(out)
}

/// `id;` ‖ name
pub fn name_import(name: &str) -> Result<Vec<u8>> {
    check_name(name)?;
    let mut out = header(OpCode::NameImport, name.len());
    out.extend_from_slice(name.as_bytes());
    Ok(out)
}

/// `id#` ‖ message hash
pub fn announce(message_hash: &str) -> Result<Vec<u8>> {
    let hash = fixed_hex::<20>("message_hash", message_hash)?;
    let mut out = header(OpCode::Announce, 20);
    out.extend_from_slice(&hash);
    Ok(out)
}
