//! Handshake error types.
//!
//! Every variant is terminal for the connection attempt: the driver tears
//! the connection down and the peer must reconnect to retry. The variants
//! distinguish *which* proof failed, because the client's reaction differs
//! (a bad server signature must abort before any further message is sent).

use cachet_crypto::CryptoError;
use cachet_proto::ProtocolError;
use thiserror::Error;

/// Errors that can occur during the mutual authentication handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The client's claimed public key did not parse as a well-formed key.
    /// The server rejects before issuing any token.
    #[error("client public key is not well-formed")]
    InvalidClientKey,

    /// The server's signed token did not recover under the known server
    /// public key (malformed data, wrong key, or corruption).
    #[error("server token does not verify under the known server key")]
    SignatureInvalid,

    /// The client-bound challenge did not decrypt under the client's own
    /// private key.
    #[error("challenge did not decrypt under this client's private key")]
    ChallengeDecryptFailed,

    /// The recovered challenge value does not equal the recovered token, so
    /// the server did not address this specific client.
    #[error("recovered challenge does not match recovered token")]
    ChallengeMismatch,

    /// Operation attempted from the wrong state.
    #[error("invalid state transition: cannot {operation} in state {state}")]
    InvalidState {
        /// State the machine was in.
        state: &'static str,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Received a frame that is not legal in the current state.
    #[error("unexpected frame: opcode {opcode:#04x} in state {state}")]
    UnexpectedFrame {
        /// State the machine was in.
        state: &'static str,
        /// Opcode of the offending frame.
        opcode: u8,
    },

    /// Payload codec failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Underlying cryptographic failure outside the proof-specific cases.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
