//! Protocol error types.
//!
//! Strongly-typed errors for framing and payload codec failures. We avoid
//! `std::io::Error` for protocol logic to keep failures matchable.

use thiserror::Error;

/// Convenience result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame did not start with the protocol magic number.
    #[error("invalid magic number")]
    InvalidMagic,

    /// Frame carried an unsupported protocol version.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Frame header named an opcode this version does not know.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Buffer ended before the full frame arrived.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload bytes the header claimed.
        expected: usize,
        /// Payload bytes actually present.
        actual: usize,
    },

    /// Payload exceeds the protocol size limit.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}
