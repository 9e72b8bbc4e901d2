//! RSA key material handling.
//!
//! Keys travel as standard PEM text blocks. Parsing accepts both PKCS#1
//! (`BEGIN RSA PUBLIC KEY`) and SPKI/PKCS#8 (`BEGIN PUBLIC KEY`) encodings;
//! export uses PKCS#1, the encoding existing peers put on the wire. Private
//! keys are loaded once at process start and are read-only afterwards -
//! they never leave the owning process and are never logged.

use rand::{CryptoRng, RngCore};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{
        DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey,
        LineEnding,
    },
    pkcs8::{DecodePrivateKey, DecodePublicKey},
};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Long-lived identity key pair for a principal (client or server).
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Private half; never transmitted or logged.
    pub private: RsaPrivateKey,
    /// Public half; freely shared as PEM.
    pub public: RsaPublicKey,
}

impl KeyPair {
    /// Build a pair from an existing private key.
    #[must_use]
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    /// Public key as a PKCS#1 PEM block.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.public.to_pkcs1_pem(LineEnding::LF).map_err(|e| CryptoError::InvalidKeyFormat {
            reason: format!("public key PEM encoding failed: {e}"),
        })
    }

    /// Private key as a PKCS#1 PEM block, zeroized when dropped.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.private.to_pkcs1_pem(LineEnding::LF).map_err(|e| CryptoError::InvalidKeyFormat {
            reason: format!("private key PEM encoding failed: {e}"),
        })
    }
}

/// Generate a fresh RSA key pair.
///
/// # Errors
///
/// - `CryptoError::InvalidKeyFormat` if `bits` is not a usable modulus size
pub fn generate_key_pair<R: CryptoRng + RngCore>(
    rng: &mut R,
    bits: usize,
) -> Result<KeyPair, CryptoError> {
    let private = RsaPrivateKey::new(rng, bits).map_err(|e| CryptoError::InvalidKeyFormat {
        reason: format!("key generation failed: {e}"),
    })?;
    Ok(KeyPair::from_private(private))
}

/// Parse a public key from PEM text (PKCS#1 or SPKI).
///
/// # Errors
///
/// - `CryptoError::InvalidKeyFormat` if the text parses under neither
///   encoding
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|e| CryptoError::InvalidKeyFormat { reason: format!("not a public key: {e}") })
}

/// Parse a private key from PEM text (PKCS#1 or PKCS#8).
///
/// # Errors
///
/// - `CryptoError::InvalidKeyFormat` if the text parses under neither
///   encoding
pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| CryptoError::InvalidKeyFormat { reason: format!("not a private key: {e}") })
}

/// Check whether a candidate string is a structurally valid public key.
///
/// Used defensively at the boundary before a key enters the encryption
/// pipeline or the handshake. Never panics, has no side effects, and
/// returns the same answer for the same input every time.
#[must_use]
pub fn is_valid_public_key(candidate: &str) -> bool {
    public_key_from_pem(candidate).is_ok()
}
