//! Error types for SlotDB
//!
//! Provides a unified error type for all operations.
//!
//! Block exhaustion and lookup misses are not errors: they surface as
//! `Ok(None)` / `Ok(false)` from the operation that hit them.

use thiserror::Error;

use crate::codec::FieldType;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for SlotDB operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Addressing Errors
    // -------------------------------------------------------------------------
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: i64, reason: String },

    /// A computed offset or bit index fell outside its valid range.
    #[error(
        "Invariant violation in block {block_address} (record_size={record_size}, record_count={record_count}): {detail}"
    )]
    InvariantViolation {
        block_address: i64,
        record_size: usize,
        record_count: usize,
        detail: String,
    },

    #[error("Size mismatch at address {address}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        address: i64,
        expected: usize,
        actual: usize,
    },

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Field type mismatch: expected {expected:?}, got {actual:?}")]
    FieldTypeMismatch {
        expected: FieldType,
        actual: FieldType,
    },

    #[error("Empty values cannot be stored in an array record")]
    EmptyValue,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
