//! Error types for cryptographic operations.
//!
//! Every fallible operation surfaces an explicit error value. Nothing is
//! retried and nothing is swallowed; callers decide whether a failure tears
//! down a connection or aborts a message send.

use thiserror::Error;

/// Errors produced by the hybrid encryption engine and token operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material did not parse as a structurally valid RSA key.
    #[error("invalid key format: {reason}")]
    InvalidKeyFormat {
        /// Why parsing failed.
        reason: String,
    },

    /// Symmetric decryption failed (wrong key or IV, corrupt ciphertext,
    /// malformed hex, or bad padding).
    ///
    /// CBC has no built-in integrity check, so a wrong key may instead
    /// yield garbage plaintext that unpads cleanly. Callers must treat any
    /// error here as "integrity failed" and never use partial output.
    #[error("symmetric decryption failed: {reason}")]
    SymmetricDecryptFailure {
        /// Why decryption failed.
        reason: String,
    },

    /// RSA unwrap of a session key failed (wrong private key or corrupt
    /// wrapped key).
    #[error("asymmetric unwrap failed: {reason}")]
    AsymmetricUnwrapFailure {
        /// Why the unwrap failed.
        reason: String,
    },

    /// A signed token did not recover under the claimed public key.
    #[error("signature invalid: {reason}")]
    SignatureInvalid {
        /// Why recovery failed.
        reason: String,
    },

    /// Producing a signed token failed (token too long for the modulus or
    /// an internal RSA failure).
    #[error("token signing failed: {reason}")]
    SigningFailed {
        /// Why signing failed.
        reason: String,
    },
}
