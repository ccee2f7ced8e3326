//! Signing keys for pay-to-public-key-hash inputs.
//!
//! Keys arrive as hex strings: 32 bytes for an uncompressed key, or 33 bytes
//! ending in `01` for a key whose public half is serialized compressed.

use bitcoin::{Address, Network, PrivateKey, PublicKey, ScriptBuf};
use secp256k1::{ecdsa::Signature, Message, Secp256k1, SecretKey};
use std::fmt;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

thread_local! {
    static SECP: Secp256k1<secp256k1::All> = Secp256k1::new();
}

/// Execute a function with the secp256k1 context
fn with_secp<F, R>(f: F) -> R
where
    F: FnOnce(&Secp256k1<secp256k1::All>) -> R,
{
    SECP.with(|secp| f(secp))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of a raw secret key
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// A private key together with the P2PKH address it controls
#[derive(Clone)]
pub struct PaymentKey {
    inner: PrivateKey,
    public: PublicKey,
    address: Address,
}

impl PaymentKey {
    /// Parse a hex private key for the given network
    pub fn from_hex(sk_hex: &str, network: Network) -> Result<Self> {
        let bytes = hex::decode(sk_hex).map_err(|e| Error::InvalidParameter {
            name: "private_key".into(),
            reason: e.to_string(),
        })?;

        let compressed = match bytes.len() {
            PRIVATE_KEY_LENGTH => false,
            n if n == PRIVATE_KEY_LENGTH + 1 && bytes[PRIVATE_KEY_LENGTH] == 0x01 => true,
            n => {
                return Err(Error::InvalidParameter {
                    name: "private_key".into(),
                    reason: format!("expected 32 or 33 bytes ending in 01, got {} bytes", n),
                })
            }
        };

        let secret = SecretKey::from_slice(&bytes[..PRIVATE_KEY_LENGTH]).map_err(|e| {
            Error::CryptoError {
                operation: "private_key_from_hex".into(),
                details: e.to_string(),
            }
        })?;

        let inner = if compressed {
            PrivateKey::new(secret, network)
        } else {
            PrivateKey::new_uncompressed(secret, network)
        };

        Ok(Self::from_private_key(inner, network))
    }

    /// Wrap an existing private key
    pub fn from_private_key(inner: PrivateKey, network: Network) -> Self {
        let public = with_secp(|secp| inner.public_key(secp));
        let address = Address::p2pkh(public.pubkey_hash(), network);
        Self { inner, public, address }
    }

    /// The P2PKH address paying to this key
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Serialized public key, compressed or not according to the key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Locking script of this key's address
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    /// Sign a 32-byte digest with a low-R ECDSA signature
    pub fn sign_digest(&self, digest: [u8; 32]) -> Signature {
        let msg = Message::from_digest(digest);
        with_secp(|secp| secp.sign_ecdsa_low_r(&msg, &self.inner.inner))
    }
}

impl fmt::Debug for PaymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentKey({}, [REDACTED])", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(hex: &str) -> PaymentKey {
        PaymentKey::from_hex(hex, Network::Bitcoin).unwrap()
    }

    #[test]
    fn test_compressed_keys_map_to_known_addresses() {
        let cases = [
            (
                "85b33fdfa5efeca980806c6ad3c8a55d67a850bd987237e7d49c967566346fbd01",
                "1br553PVnK6F5nyBtb4ju1owwBKdsep5c",
            ),
            (
                "744196d67ed78fe39009c71fbfd53e6ecca98353fbfe81ccba21b0703a69be9c01",
                "16xVjkJ3nY62B9t9q3N9wY6hx1duAfwRZR",
            ),
            (
                "12f90d1b9e34d8df56f0dc6754a97ab4a2eb962918c281b1b552162438e313c001",
                "1HEjCcUjZXtbiDnCYviHLVZvSQsSZoDRFa",
            ),
            (
                "58f7b29ee4a9a8b05855591b8a5405a0647c74c0a539515173adb9a32c964a9a01",
                "16TaQJi78o4A3nKDSzswqZiX3bhecNuNBQ",
            ),
        ];
        for (sk, address) in cases {
            let k = key(sk);
            assert!(k.public_key().compressed);
            assert_eq!(k.address().to_string(), address);
        }
    }

    #[test]
    fn test_uncompressed_key() {
        let k = key("0101010101010101010101010101010101010101010101010101010101010101");
        assert!(!k.public_key().compressed);
        assert_eq!(k.public_key().to_bytes().len(), 65);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(PaymentKey::from_hex("abcd", Network::Bitcoin).is_err());
        let bad_suffix = format!("{}02", "01".repeat(32));
        assert!(PaymentKey::from_hex(&bad_suffix, Network::Bitcoin).is_err());
        assert!(PaymentKey::from_hex("zz", Network::Bitcoin).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let k = key("0101010101010101010101010101010101010101010101010101010101010101");
        let dbg = format!("{:?}", k);
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("0101010101"));
    }

    #[test]
    fn test_signature_is_low_r() {
        let k = key("0101010101010101010101010101010101010101010101010101010101010101");
        let sig = k.sign_digest([7u8; 32]);
        assert!(sig.serialize_der().len() <= 70);
    }
}
