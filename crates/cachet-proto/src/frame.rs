//! Frame type with fixed binary header.
//!
//! Layout on the wire (Big Endian):
//!
//! `[magic: u32] [version: u8] [opcode: u8] [payload_size: u32] + payload`
//!
//! The header is 10 bytes; the payload is already-encoded CBOR. A `Frame`
//! is a pure data holder; payload semantics live in
//! [`Payload`](crate::Payload).

use bytes::{BufMut, Bytes};

use crate::errors::{ProtocolError, Result};

/// Operation codes, one per payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Client announces its public key.
    ClientHello = 0x01,
    /// Server issues signed token and client-bound challenge.
    TokenIssue = 0x02,
    /// Client reports its verification outcome.
    ValidateResult = 0x03,
    /// Server acknowledges a validated connection (zero payload).
    Validated = 0x04,
    /// Either side terminates the connection.
    Goodbye = 0x05,
}

impl Opcode {
    /// Wire value of this opcode.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse an opcode from its wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ClientHello),
            0x02 => Some(Self::TokenIssue),
            0x03 => Some(Self::ValidateResult),
            0x04 => Some(Self::Validated),
            0x05 => Some(Self::Goodbye),
            _ => None,
        }
    }
}

/// Complete protocol frame (transport layer).
///
/// # Invariants
///
/// - Size Consistency: the encoded header's `payload_size` always equals
///   `payload.len()`; [`Frame::encode`] writes it from the payload and
///   [`Frame::decode`] verifies the claim against the buffer.
/// - Size Limit: payloads over [`Frame::MAX_PAYLOAD_SIZE`] are rejected at
///   both encode and decode.
///
/// # Security
///
/// Provides structural validity only: magic, version, opcode, and size are
/// checked, but nothing here is authenticated. Authentication is the
/// handshake's job, on top of these frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Operation code identifying the payload type.
    pub opcode: Opcode,

    /// Raw payload bytes (already CBOR-encoded).
    pub payload: Bytes,
}

impl Frame {
    /// Size of the serialized header in bytes.
    pub const HEADER_SIZE: usize = 10;

    /// Magic number: "CACH" in ASCII.
    pub const MAGIC: u32 = 0x4341_4348;

    /// Current protocol version.
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (1 MB). Handshake payloads are a few KB at
    /// most; anything larger is hostile or corrupt.
    pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

    /// Create a new frame.
    #[must_use]
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self { opcode, payload: payload.into() }
    }

    /// Encode frame into a buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`Frame::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        dst.put_u32(Self::MAGIC);
        dst.put_u8(Self::VERSION);
        dst.put_u8(self.opcode.to_u8());
        dst.put_u32(self.payload.len() as u32);
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode a frame from wire bytes.
    ///
    /// Validation happens before any payload copy: magic first, then
    /// version, opcode, and size, failing fast on garbage input. Trailing
    /// bytes beyond the claimed payload are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTruncated` if the buffer is shorter than the
    ///   header or the claimed payload
    /// - `ProtocolError::InvalidMagic` / `UnsupportedVersion` /
    ///   `UnknownOpcode` on header validation failure
    /// - `ProtocolError::PayloadTooLarge` if the header claims more than
    ///   [`Frame::MAX_PAYLOAD_SIZE`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(header) = bytes.get(..Self::HEADER_SIZE) else {
            return Err(ProtocolError::FrameTruncated {
                expected: Self::HEADER_SIZE,
                actual: bytes.len(),
            });
        };

        // Infallible slicing: header is exactly HEADER_SIZE bytes
        let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if magic != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header[4] != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header[4]));
        }

        let opcode =
            Opcode::from_u8(header[5]).ok_or(ProtocolError::UnknownOpcode(header[5]))?;

        let payload_size = u32::from_be_bytes([header[6], header[7], header[8], header[9]]) as usize;
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size,
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let Some(payload) = bytes.get(Self::HEADER_SIZE..Self::HEADER_SIZE + payload_size) else {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(Self::HEADER_SIZE),
            });
        };

        Ok(Self { opcode, payload: Bytes::copy_from_slice(payload) })
    }
}
