//! Symmetric message encryption using AES-256-CBC.
//!
//! Produces the wire envelope format: 32 hex characters of IV immediately
//! followed by the hex-encoded ciphertext, with no separator. The IV is not
//! secret and travels in the clear; the session key never does.
//!
//! All functions are pure - the random source is provided by the caller.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Session key length in bytes (AES-256).
pub const SESSION_KEY_LEN: usize = 32;

/// IV length in bytes (AES block size).
pub const IV_LEN: usize = 16;

/// Length of the hex-encoded IV prefix in the envelope.
pub const IV_HEX_LEN: usize = 2 * IV_LEN;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// One-time symmetric key for a single message.
///
/// Generated fresh per [`seal`] call, never persisted, zeroized on drop.
/// On the wire it exists only inside a [`crate::WrappedKeyPacket`].
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Draw a fresh key from the given random source.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Construct from raw bytes (e.g. after an RSA unwrap).
    #[must_use]
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Construct from a slice, failing if the length is wrong.
    ///
    /// # Errors
    ///
    /// - `CryptoError::AsymmetricUnwrapFailure` if the slice is not exactly
    ///   32 bytes (a wrong private key typically unwraps to garbage of the
    ///   wrong length)
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SESSION_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::AsymmetricUnwrapFailure {
                reason: format!("unwrapped key has length {}, expected {SESSION_KEY_LEN}", bytes.len()),
            })?;
        Ok(Self(bytes))
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("SessionKey(..)")
    }
}

/// The combined IV-plus-ciphertext unit produced by symmetric encryption.
///
/// Wire layout: `hex(iv) ‖ hex(ciphertext)`, where the IV prefix is always
/// exactly [`IV_HEX_LEN`] characters. No framing, length prefix, or
/// integrity tag is part of the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope(String);

impl Envelope {
    /// Wrap a wire string without validating it.
    ///
    /// Validation happens in [`open`]; a malformed envelope fails there
    /// with `SymmetricDecryptFailure`.
    pub fn from_wire(wire: impl Into<String>) -> Self {
        Self(wire.into())
    }

    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the wire string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypt a message under a fresh session key and IV.
///
/// An absent message is treated as the empty string; this call never fails
/// on missing input. Two calls with identical input produce different keys
/// and different envelopes (fresh randomness every call).
pub fn seal<R: CryptoRng + RngCore>(message: Option<&str>, rng: &mut R) -> (SessionKey, Envelope) {
    let key = SessionKey::generate(rng);
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let plaintext = message.unwrap_or("");
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), (&iv).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut wire = String::with_capacity(IV_HEX_LEN + 2 * ciphertext.len());
    wire.push_str(&hex::encode(iv));
    wire.push_str(&hex::encode(&ciphertext));

    (key, Envelope(wire))
}

/// Decrypt an envelope with the given session key.
///
/// Splits the envelope at the fixed IV boundary and attempts AES-256-CBC
/// decryption with PKCS#7 unpadding.
///
/// # Errors
///
/// - `CryptoError::SymmetricDecryptFailure` on a short or non-hex envelope,
///   bad padding, or non-UTF-8 plaintext. A wrong key is *usually* caught
///   by unpadding or UTF-8 validation, but CBC provides no integrity check,
///   so garbage output can occasionally decode cleanly.
pub fn open(envelope: &Envelope, key: &SessionKey) -> Result<String, CryptoError> {
    let wire = envelope.as_str().as_bytes();
    if wire.len() < IV_HEX_LEN {
        return Err(CryptoError::SymmetricDecryptFailure {
            reason: format!("envelope too short: {} chars, need at least {IV_HEX_LEN}", wire.len()),
        });
    }

    let iv_bytes = hex::decode(&wire[..IV_HEX_LEN]).map_err(|e| {
        CryptoError::SymmetricDecryptFailure { reason: format!("invalid IV hex: {e}") }
    })?;
    // Infallible: 32 hex chars always decode to 16 bytes
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&iv_bytes);

    let ciphertext = hex::decode(&wire[IV_HEX_LEN..]).map_err(|e| {
        CryptoError::SymmetricDecryptFailure { reason: format!("invalid ciphertext hex: {e}") }
    })?;

    let plaintext = Aes256CbcDec::new(key.as_bytes().into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CryptoError::SymmetricDecryptFailure {
            reason: "bad padding or ciphertext length".to_string(),
        })?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::SymmetricDecryptFailure {
        reason: "plaintext is not valid UTF-8".to_string(),
    })
}
