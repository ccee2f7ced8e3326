//! Error types for the BNS transaction engine.
//!
//! Every expected failure of building, funding or broadcasting a transaction
//! is a variant here. Callers can branch on [`Error::code`] to get the stable
//! wire name of the failure kind.

use thiserror::Error;

/// Result type alias for BNS transaction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the BNS transaction engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Funding Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Candidate UTXOs cannot cover the target amount plus fees
    #[error("Not enough UTXOs to fund. Left to fund: {shortfall}")]
    NotEnoughFunds {
        /// Satoshis still missing after every candidate was consumed
        shortfall: u64,
    },

    /// The requested spend cannot pay for its own fees
    #[error("Not enough coin to fund fees transaction fees. Fees would be {fees}, specified spend is {specified}")]
    InvalidAmount {
        /// Fee the transaction would need
        fees: u64,
        /// Amount the caller asked to spend
        specified: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Parameter Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A required argument was absent
    #[error("Missing parameter: {name}")]
    MissingParameter {
        /// Name of the missing argument, as it appears on the wire
        name: String,
    },

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Encoding Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A string contains a character outside the base-40 alphabet
    #[error("Invalid base-40 character {character:?} in {input:?}")]
    InvalidB40 {
        /// Offending input string
        input: String,
        /// First character outside the alphabet
        character: char,
    },

    /// Operation payload does not fit in a null-data output
    #[error("Payload of {size} bytes exceeds null-data limit of {max} bytes")]
    PayloadTooLarge {
        /// Encoded payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Network Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A backend answered with a failure status or an embedded error field
    #[error("Remote service error from {url}: status {status}: {body}")]
    RemoteService {
        /// HTTP status code of the response
        status: u16,
        /// Requested URL
        url: String,
        /// Response body as text
        body: String,
    },

    /// The backend reports the transaction or name as unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure (connection, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    // ═══════════════════════════════════════════════════════════════════
    // Signing Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Cryptographic operation failed
    #[error("Crypto error in {operation}: {details}")]
    CryptoError {
        /// Operation that failed
        operation: String,
        /// Error details
        details: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::MissingParameter`]
    pub fn missing(name: impl Into<String>) -> Self {
        Error::MissingParameter { name: name.into() }
    }

    /// Returns the stable error kind name for external systems
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotEnoughFunds { .. } => "not_enough_funds",
            Error::InvalidAmount { .. } => "invalid_amount",
            Error::MissingParameter { .. } => "missing_parameter",
            Error::InvalidParameter { .. } => "invalid_parameter",
            Error::InvalidB40 { .. } => "encoding_error",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::RemoteService { .. } => "remote_service_error",
            Error::NotFound(_) => "not_found",
            Error::Network(_) => "network_error",
            Error::CryptoError { .. } => "crypto_error",
            Error::Serialization(_) => "serialization_error",
            Error::Deserialization(_) => "deserialization_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
            Error::Lock => "lock_error",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::NotEnoughFunds { shortfall: 0 }.code(),
            Error::InvalidAmount { fees: 0, specified: 0 }.code(),
            Error::missing("zoneFile").code(),
            Error::invalid("amount", "zero").code(),
            Error::InvalidB40 { input: String::new(), character: '!' }.code(),
            Error::RemoteService { status: 500, url: String::new(), body: String::new() }.code(),
            Error::NotFound("".into()).code(),
            Error::Network("".into()).code(),
            Error::Config("".into()).code(),
            Error::Internal("".into()).code(),
            Error::Lock.code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidAmount { fees: 226_000, specified: 80_000 };
        assert!(err.to_string().contains("226000"));
        assert!(err.to_string().contains("80000"));

        let err = Error::missing("preorderTransaction");
        assert_eq!(err.to_string(), "Missing parameter: preorderTransaction");
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Error::missing("transaction").code(), "missing_parameter");
        assert_eq!(
            Error::RemoteService { status: 400, url: "x".into(), body: "y".into() }.code(),
            "remote_service_error"
        );
        assert_eq!(Error::NotFound("tx".into()).code(), "not_found");
    }
}
