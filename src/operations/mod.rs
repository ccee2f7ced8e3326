//! Protocol operations.
//!
//! - Payload encoding for every operation
//! - Namespace reveal parameters
//! - Pre-flight safety checks
//! - [`TransactionFactory`] for estimating and building transactions

pub mod factory;
pub mod namespace;
pub mod payloads;
pub mod safety;

pub use factory::TransactionFactory;
pub use namespace::{validate_namespace_id, NamespaceDefinition};
pub use payloads::{parse_payload, OpCode, ParsedPayload};
