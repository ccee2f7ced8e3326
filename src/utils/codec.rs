//! Hashing and base-40 packing used by operation payloads.

use num_bigint::BigUint;
use num_traits::Zero;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::utils::constants::B40_ALPHABET;

/// SHA-256 of the input.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RIPEMD-160 of SHA-256 of the input.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    let mut out = [0u8; 20];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// First 16 bytes of SHA-256 of the input.
///
/// Embedded in update and transfer payloads where only 16 bytes of room are
/// left for the name commitment.
pub fn hash128(data: &[u8]) -> [u8; 16] {
    let digest = sha256(data);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// Interpret `input` as a base-40 number, leftmost character most significant.
///
/// The alphabet is `0-9`, `a-z`, `-`, `_`, `.`, `+`; anything else is rejected.
pub fn decode_b40(input: &str) -> Result<BigUint> {
    let mut value = BigUint::zero();
    for character in input.chars() {
        let digit = B40_ALPHABET
            .find(character)
            .ok_or_else(|| Error::InvalidB40 {
                input: input.to_string(),
                character,
            })?;
        value = value * 40u32 + digit as u32;
    }
    Ok(value)
}

/// Big-endian bytes of the base-40 value of `input`, as committed in preorders.
pub fn b40_bytes(input: &str) -> Result<Vec<u8>> {
    Ok(decode_b40(input)?.to_bytes_be())
}

/// Decode a hex string that must hold exactly `N` bytes.
pub fn fixed_hex<const N: usize>(name: &str, value: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(value).map_err(|e| Error::invalid(name, e.to_string()))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        Error::invalid(name, format!("expected {} bytes, got {}", N, v.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash160_vectors() {
        assert_eq!(
            hex::encode(hash160(b"99999566ahjhqwuywqehpzlzlzlzl09189128921jkjlqjosq")),
            "7ea1fa0f2003c31b015a72af9f4a5f104b5c2840"
        );
        assert_eq!(
            hex::encode(hash160(b"1234")),
            "fd7a0d80999bedd76c9a0828057817fc6049a507"
        );
    }

    #[test]
    fn test_hash128_vectors() {
        assert_eq!(hex::encode(hash128(b"999")), "83cf8b609de60036a8277bd0e9613575");
        assert_eq!(
            hex::encode(hash128(b"99999566ahjhqwuywqehpzlzlzlzl09189128921jkjlqjosqaaa")),
            "740ae7f18c939cf5e7c189a2c77a012f"
        );
    }

    #[test]
    fn test_decode_b40_vector() {
        let input = B40_ALPHABET.repeat(5);

        let expected = concat!(
            "384a516059e707615a1992d3101f6f346df3326d03ea7b673e3754078895db48da2d0",
            "fcb1bd89d618b0863bd8bac6db43a2d9cff5cc307310922d3cb8cf9c159d31c6a9c91",
            "03197263a4e88f52d1b77dfc610e1b8dc9616ba6c2d0a1b792f0d73784c698c69f34a",
            "e5e7900753627a3ac87529035fb1a6cba7ce2e1df590941cf30a44557",
        );
        assert_eq!(decode_b40(&input).unwrap().to_str_radix(16), expected);
    }

    #[test]
    fn test_decode_b40_small_values() {
        assert_eq!(decode_b40("").unwrap(), BigUint::zero());
        assert_eq!(decode_b40("a").unwrap(), BigUint::from(10u32));
        assert_eq!(decode_b40("10").unwrap(), BigUint::from(40u32));
        assert_eq!(decode_b40("+").unwrap(), BigUint::from(39u32));
    }

    #[test]
    fn test_decode_b40_rejects_foreign_characters() {
        let err = decode_b40("Hello").unwrap_err();
        assert_eq!(err.code(), "encoding_error");
        assert!(matches!(err, Error::InvalidB40 { character: 'H', .. }));
    }

    #[test]
    fn test_fixed_hex() {
        let bytes: [u8; 2] = fixed_hex("h", "abcd").unwrap();
        assert_eq!(bytes, [0xab, 0xcd]);
        assert!(fixed_hex::<3>("h", "abcd").is_err());
        assert!(fixed_hex::<2>("h", "zz00").is_err());
    }

    proptest! {
        #[test]
        fn prop_b40_is_positional(name in "[0-9a-z._+-]{1,20}", tail in "[0-9a-z._+-]") {
            let extended = format!("{}{}", name, tail);
            let digit = B40_ALPHABET.find(tail.chars().next().unwrap()).unwrap() as u32;
            prop_assert_eq!(
                decode_b40(&extended).unwrap(),
                decode_b40(&name).unwrap() * 40u32 + digit
            );
        }
    }
}
