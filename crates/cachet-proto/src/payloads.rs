//! CBOR-encoded handshake messages.
//!
//! Frame headers are raw binary; payloads use CBOR for type safety and
//! forward compatibility. The frame header's opcode identifies the payload
//! type, so only the inner struct is serialized - no variant tag, which
//! prevents mismatched opcode/payload pairs.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one opcode (enforced by match
//! exhaustiveness). Round-trip encoding must produce an equivalent value.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    frame::{Frame, Opcode},
};

/// Client announces its PEM-encoded public key on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
    /// The client's claimed public key as a PEM text block.
    pub public_key_pem: String,
}

/// Server's two proofs, issued after validating the client's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIssue {
    /// Token "encrypted" with the server's private key; recoverable with
    /// the server's public key.
    pub signed_token: Vec<u8>,

    /// The same token encrypted under the client's public key; only the
    /// matching private key can recover it.
    pub challenge: Vec<u8>,
}

/// Client's verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResult {
    /// True if both proofs checked out on the client side.
    pub ok: bool,
}

/// Connection termination with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goodbye {
    /// Human-readable reason, safe to log.
    pub reason: String,
}

/// All possible frame payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Client announces its public key.
    ClientHello(ClientHello),
    /// Server issues its proofs.
    TokenIssue(TokenIssue),
    /// Client reports its outcome.
    ValidateResult(ValidateResult),
    /// Server acknowledges validation (zero-byte payload).
    Validated,
    /// Either side terminates.
    Goodbye(Goodbye),
}

impl Payload {
    /// Opcode corresponding to this payload type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::ClientHello(_) => Opcode::ClientHello,
            Self::TokenIssue(_) => Opcode::TokenIssue,
            Self::ValidateResult(_) => Opcode::ValidateResult,
            Self::Validated => Opcode::Validated,
            Self::Goodbye(_) => Opcode::Goodbye,
        }
    }

    /// Encode payload bytes into a buffer (inner struct only, no tag).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::ClientHello(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::TokenIssue(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ValidateResult(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Validated => Ok(()), // Zero-byte payload
            Self::Goodbye(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a payload from bytes based on opcode.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        let payload = match opcode {
            Opcode::ClientHello => Self::ClientHello(
                ciborium::de::from_reader(bytes)
                    .map_err(|e| ProtocolError::CborDecode(e.to_string()))?,
            ),
            Opcode::TokenIssue => Self::TokenIssue(
                ciborium::de::from_reader(bytes)
                    .map_err(|e| ProtocolError::CborDecode(e.to_string()))?,
            ),
            Opcode::ValidateResult => Self::ValidateResult(
                ciborium::de::from_reader(bytes)
                    .map_err(|e| ProtocolError::CborDecode(e.to_string()))?,
            ),
            Opcode::Validated => Self::Validated,
            Opcode::Goodbye => Self::Goodbye(
                ciborium::de::from_reader(bytes)
                    .map_err(|e| ProtocolError::CborDecode(e.to_string()))?,
            ),
        };

        Ok(payload)
    }

    /// Encode this payload into a complete frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self) -> Result<Frame> {
        let mut payload = Vec::new();
        self.encode(&mut payload)?;
        Ok(Frame::new(self.opcode(), payload))
    }

    /// Decode a payload from a complete frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        Self::decode(frame.opcode, &frame.payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn roundtrip(payload: Payload) {
        let frame = payload.clone().into_frame().unwrap();
        assert_eq!(frame.opcode, payload.opcode());
        assert_eq!(Payload::from_frame(&frame).unwrap(), payload);
    }

    #[test]
    fn client_hello_roundtrip() {
        roundtrip(Payload::ClientHello(ClientHello {
            public_key_pem: "-----BEGIN RSA PUBLIC KEY-----\n...\n-----END RSA PUBLIC KEY-----\n"
                .to_string(),
        }));
    }

    #[test]
    fn token_issue_roundtrip() {
        roundtrip(Payload::TokenIssue(TokenIssue {
            signed_token: vec![0xAA; 128],
            challenge: vec![0xBB; 128],
        }));
    }

    #[test]
    fn validated_is_zero_bytes() {
        let frame = Payload::Validated.into_frame().unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(Payload::from_frame(&frame).unwrap(), Payload::Validated);
    }

    #[test]
    fn mismatched_opcode_fails_decode() {
        // A TokenIssue body under the ClientHello opcode must not parse
        let frame = Payload::TokenIssue(TokenIssue {
            signed_token: vec![1, 2, 3],
            challenge: vec![4, 5, 6],
        })
        .into_frame()
        .unwrap();

        let mangled = Frame::new(Opcode::ClientHello, frame.payload);
        assert!(matches!(Payload::from_frame(&mangled), Err(ProtocolError::CborDecode(_))));
    }

    proptest! {
        #[test]
        fn validate_result_roundtrip(ok in any::<bool>()) {
            roundtrip(Payload::ValidateResult(ValidateResult { ok }));
        }

        #[test]
        fn goodbye_roundtrip(reason in ".*") {
            roundtrip(Payload::Goodbye(Goodbye { reason }));
        }

        #[test]
        fn token_issue_arbitrary_blocks(
            signed in proptest::collection::vec(any::<u8>(), 0..512),
            challenge in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            roundtrip(Payload::TokenIssue(TokenIssue { signed_token: signed, challenge }));
        }
    }
}
