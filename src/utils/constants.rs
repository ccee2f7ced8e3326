//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// BITCOIN CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Smallest output value the protocol will create, in satoshis
pub const DUST_MINIMUM: u64 = 5500;

/// Maximum size of a null-data payload accepted by standard relay policy
pub const MAX_NULL_DATA_SIZE: usize = 80;

/// Pay-to-public-key-hash address of the all-zero hash, used as the default burn address
pub const DEFAULT_BURN_ADDRESS: &str = "1111111111111111111114oLvT2";

/// Confirmations the relay waits for before forwarding a watched broadcast
pub const DEFAULT_CONFIRMATIONS: u32 = 6;

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION SIZE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialized transaction sizes in bytes, used for fee estimation
pub mod tx_size {
    /// Version (4) + locktime (4)
    pub const TX_VERSION_AND_LOCKTIME: u64 = 4 + 4;

    /// Serialized size of a transaction with no inputs and no outputs
    pub const TX_EMPTY_SIZE: u64 = TX_VERSION_AND_LOCKTIME + 1 + 1;

    /// Outpoint (32 + 4) + sequence (4)
    pub const TX_OUTPOINT_AND_SEQUENCE: u64 = 32 + 4 + 4;

    /// Signature push (1 + 72) + public key push (1 + 33)
    pub const TX_INPUT_PUBKEYHASH: u64 = 107;

    /// Estimated size of one signed pay-to-public-key-hash input
    pub const TX_P2PKH_INPUT: u64 = TX_OUTPOINT_AND_SEQUENCE + 1 + TX_INPUT_PUBKEYHASH;

    /// Output value field
    pub const TX_OUTPUT_VALUE: u64 = 8;

    /// Pay-to-public-key-hash locking script
    pub const TX_OUTPUT_PUBKEYHASH: u64 = 25;

    /// Size of one standard pay-to-public-key-hash output
    pub const TX_P2PKH_OUTPUT: u64 = TX_OUTPUT_VALUE + 1 + TX_OUTPUT_PUBKEYHASH;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Two-byte magic that prefixes every operation payload
pub const MAGIC_BYTES: &[u8; 2] = b"id";

/// Width of the name field in a register payload carrying a value hash
pub const REGISTER_NAME_FIELD_SIZE: usize = 37;

/// Longest namespace identifier the protocol accepts
pub const MAX_NAMESPACE_ID_LENGTH: usize = 19;

/// Number of price buckets in a namespace reveal
pub const NAMESPACE_BUCKET_COUNT: usize = 16;

/// Blocks after reveal during which a version-2 namespace pays its creator
pub const NAMESPACE_CREATOR_PAY_WINDOW: u64 = 52_595;

/// Longest fully qualified name, dot and namespace included
pub const MAX_NAME_LENGTH: usize = 37;

/// Names an address may own before it stops accepting new ones
pub const MAX_NAMES_PER_ADDRESS: usize = 25;

/// Blocks after expiry during which only the owner may renew
pub const NAME_GRACE_PERIOD: u64 = 5_000;

/// Consensus hash placeholder used when only the payload size matters
pub const DUMMY_CONSENSUS_HASH: &str = "00000000000000000000000000000000";

/// Hash placeholder used when only the payload size matters
pub const DUMMY_VALUE_HASH: &str = "ffffffffffffffffffffffffffffffffffffffff";

/// Base-40 alphabet used to pack names into integers
pub const B40_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz-_.+";

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default registry (core node) endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://core.blockstack.org";

/// Default broadcast relay endpoint
pub const DEFAULT_BROADCAST_URL: &str = "https://broadcast.blockstack.org";

/// Default Insight-style UTXO service endpoint
pub const DEFAULT_INSIGHT_URL: &str = "https://utxo.blockstack.org";

/// Default legacy unspent-outputs endpoint
pub const DEFAULT_BLOCKCHAIN_INFO_URL: &str = "https://blockchain.info";

/// Default fee recommendation endpoint
pub const DEFAULT_FEE_SERVICE_URL: &str = "https://bitcoinfees.earn.com/api/v1/fees/recommended";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
