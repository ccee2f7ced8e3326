//! Namespace reveal parameters.
//!
//! A [`NamespaceDefinition`] carries the pricing rules a namespace is
//! revealed with. It is checked as a whole by [`NamespaceDefinition::validate`]
//! and packed into the reveal payload by [`NamespaceDefinition::encode`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::{MAX_NAMESPACE_ID_LENGTH, NAMESPACE_BUCKET_COUNT};

/// Largest value a bucket exponent or discount may take
const MAX_NIBBLE: u8 = 15;

/// Check that `namespace_id` is 1..=19 characters of `[0-9a-z_-]`
pub fn validate_namespace_id(namespace_id: &str) -> Result<()> {
    if namespace_id.is_empty() || namespace_id.len() > MAX_NAMESPACE_ID_LENGTH {
        return Err(Error::invalid(
            "namespace_id",
            format!("must be 1 to {} characters", MAX_NAMESPACE_ID_LENGTH),
        ));
    }

    if let Some(c) = namespace_id
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
    {
        return Err(Error::invalid(
            "namespace_id",
            format!("invalid character {:?}", c),
        ));
    }

    Ok(())
}

/// Pricing and lifetime rules of a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    /// Namespace identifier, without the leading dot
    pub namespace_id: String,
    /// Rules version
    pub version: u16,
    /// Name lifetime in blocks
    pub lifetime: u32,
    /// Price coefficient
    pub coeff: u8,
    /// Price base
    pub base: u8,
    /// Price exponent per name length, each below 16
    pub buckets: [u8; NAMESPACE_BUCKET_COUNT],
    /// Discount for names containing non-alphabetic characters, 1..=15
    pub nonalpha_discount: u8,
    /// Discount for names without vowels, 1..=15
    pub no_vowel_discount: u8,
}

impl NamespaceDefinition {
    /// Definition with conventional defaults for `namespace_id`
    pub fn new(namespace_id: impl Into<String>) -> Result<Self> {
        let namespace_id = namespace_id.into();
        validate_namespace_id(&namespace_id)?;

        Ok(Self {
            namespace_id,
            version: 1,
            lifetime: 52_595,
            coeff: 4,
            base: 4,
            buckets: [6, 5, 4, 3, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            nonalpha_discount: 10,
            no_vowel_discount: 10,
        })
    }

    /// Replace the bucket exponents; exactly 16 values below 16
    pub fn with_buckets(mut self, buckets: &[u8]) -> Result<Self> {
        self.buckets = buckets.try_into().map_err(|_| {
            Error::invalid(
                "buckets",
                format!("expected {} buckets, got {}", NAMESPACE_BUCKET_COUNT, buckets.len()),
            )
        })?;
        self.validate()?;
        Ok(self)
    }

    /// Check every field range
    pub fn validate(&self) -> Result<()> {
        validate_namespace_id(&self.namespace_id)?;

        if let Some(b) = self.buckets.iter().find(|b| **b > MAX_NIBBLE) {
            return Err(Error::invalid("buckets", format!("exponent {} exceeds 15", b)));
        }

        for (name, discount) in [
            ("nonalpha_discount", self.nonalpha_discount),
            ("no_vowel_discount", self.no_vowel_discount),
        ] {
            if discount == 0 || discount > MAX_NIBBLE {
                return Err(Error::invalid(name, "must be between 1 and 15"));
            }
        }

        Ok(())
    }

    /// Reveal body: lifetime, coeff, base, buckets, discounts, version, id.
    ///
    /// Buckets and discounts are packed two per byte, high nibble first.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut out = Vec::with_capacity(17 + self.namespace_id.len());
        out.extend_from_slice(&self.lifetime.to_be_bytes());
        out.push(self.coeff);
        out.push(self.base);
        out.extend(self.buckets.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
        out.push((self.nonalpha_discount << 4) | self.no_vowel_discount);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(self.namespace_id.as_bytes());
        Ok(out)
    }
}
