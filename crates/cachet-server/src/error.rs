//! Server error types.

use cachet_core::HandshakeError;
use cachet_crypto::CryptoError;
use cachet_proto::ProtocolError;
use thiserror::Error;

/// Errors that can occur during server operations.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration (bad bind address, unusable paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure (socket I/O, peer disconnect).
    #[error("transport error: {0}")]
    Transport(String),

    /// Key material could not be loaded, generated, or persisted.
    #[error("keystore error: {0}")]
    Keystore(String),

    /// The handshake was aborted by protocol or cryptographic failure.
    /// Terminal for the connection; the peer must reconnect.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Frame codec failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Cryptographic failure outside the handshake itself.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The peer did not complete the handshake in time.
    #[error("handshake timed out")]
    Timeout,
}
