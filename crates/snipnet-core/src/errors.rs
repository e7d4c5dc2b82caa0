//! Error types for the snipnet protocol
//!
//! Codec errors are separated from the top-level error so the listen loop
//! can dispatch on exactly what went wrong with a datagram (unknown verbs
//! are dropped silently, bad peer payloads still credit the sender).

use thiserror::Error;

// ----------------------------------------------------------------------------
// Wire Codec Errors
// ----------------------------------------------------------------------------

/// Errors produced while decoding a UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("datagram shorter than the 4-byte verb")]
    Truncated,

    #[error("unknown verb {verb:?}")]
    UnknownVerb { verb: String },

    #[error("invalid peer address {input:?}")]
    InvalidAddress { input: String },

    #[error("invalid lamport timestamp {input:?}")]
    InvalidTimestamp { input: String },
}

// ----------------------------------------------------------------------------
// Top-Level Error
// ----------------------------------------------------------------------------

/// Unified error type for snipnet operations.
#[derive(Debug, Error)]
pub enum SnipnetError {
    #[error("wire protocol error: {0}")]
    Wire(#[from] WireError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry protocol error: {reason}")]
    Registry { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for snipnet operations.
pub type Result<T> = std::result::Result<T, SnipnetError>;
