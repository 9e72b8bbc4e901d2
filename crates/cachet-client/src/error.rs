//! Client error types.

use cachet_core::HandshakeError;
use cachet_crypto::CryptoError;
use cachet_proto::ProtocolError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid configuration (bad address, unreadable key file).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure (socket I/O, peer disconnect).
    #[error("transport error: {0}")]
    Transport(String),

    /// The handshake failed verification. Terminal; nothing further was
    /// sent to the server.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Frame codec failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Cryptographic failure outside the handshake itself.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The server closed the connection before the handshake completed.
    #[error("rejected by server: {reason}")]
    Rejected {
        /// Reason carried in the server's goodbye, if any.
        reason: String,
    },

    /// The server did not respond in time.
    #[error("handshake timed out")]
    Timeout,
}
