//! Error types for Strata
//!
//! Provides a unified error type for all recoverable failures. Violated
//! upgrade preconditions are not represented here: they panic.

use thiserror::Error;

use crate::codec::ValueType;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for Strata operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Key-Value Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Key already exists")]
    KeyExists,

    #[error("KV error: {0}")]
    Kv(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Type mismatch: value is {actual:?}, attribute is {expected:?}")]
    TypeMismatch { expected: ValueType, actual: ValueType },

    // -------------------------------------------------------------------------
    // Descriptor Errors
    // -------------------------------------------------------------------------
    #[error("do not find the descriptor")]
    DescriptorNotFound,

    #[error("the descriptor saved is not the wanted one")]
    DescriptorMismatch,

    #[error("decode the descriptor failed: {0}")]
    DecodeDescriptor(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Storage Layout Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Segment {0} is sorted and cannot accept new blocks")]
    SegmentImmutable(u64),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StrataError {
    /// True for both a KV point-get miss and an exhausted descriptor scan
    pub fn is_not_found(&self) -> bool {
        matches!(self, StrataError::KeyNotFound | StrataError::DescriptorNotFound)
    }
}
