//! Recoverable token signatures.
//!
//! The handshake's proof of server identity is a token "encrypted" with the
//! server's private key: anyone holding the server's public key can recover
//! the token bytes, and a successful recovery proves the artifact was
//! produced by the private-key holder. Existing peers produce these with a
//! `privateEncrypt`/`publicDecrypt` pair, so the exact padding layout is a
//! wire-compatibility requirement.
//!
//! This is NOT a standard signature scheme. It uses the raw RSA permutation
//! with PKCS#1 v1.5 block type 1 padding and offers no hash binding; it
//! authenticates only the exact recovered bytes. New protocol surfaces
//! should prefer a real signature scheme.

use rand::{CryptoRng, RngCore};
use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    hazmat::{rsa_decrypt, rsa_encrypt},
    traits::PublicKeyParts,
};

use crate::error::CryptoError;

/// PKCS#1 v1.5 overhead: two marker bytes, separator, and eight bytes of
/// padding minimum.
const PKCS1_OVERHEAD: usize = 11;

/// Minimum length of the 0xFF padding string.
const MIN_PAD_LEN: usize = 8;

/// Sign a token by applying the private RSA operation to a padded block.
///
/// The result is exactly one modulus width (`private_key.size()` bytes) and
/// is recoverable with [`recover_token`].
///
/// # Errors
///
/// - `CryptoError::SigningFailed` if the token exceeds `size - 11` bytes or
///   the RSA operation fails
pub fn sign_token<R: CryptoRng + RngCore>(
    private_key: &RsaPrivateKey,
    token: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let k = private_key.size();
    if token.len() + PKCS1_OVERHEAD > k {
        return Err(CryptoError::SigningFailed {
            reason: format!("token length {} exceeds maximum {} for this key", token.len(), k - PKCS1_OVERHEAD),
        });
    }

    // EM = 0x00 || 0x01 || 0xFF..0xFF || 0x00 || token  (block type 1)
    let mut em = vec![0xFFu8; k];
    em[0] = 0x00;
    em[1] = 0x01;
    em[k - token.len() - 1] = 0x00;
    em[k - token.len()..].copy_from_slice(token);

    let m = BigUint::from_bytes_be(&em);
    let c = rsa_decrypt(Some(rng), private_key, &m)
        .map_err(|e| CryptoError::SigningFailed { reason: format!("RSA operation failed: {e}") })?;

    Ok(to_fixed_width(&c, k))
}

/// Recover a token from a signed artifact using the signer's public key.
///
/// # Errors
///
/// - `CryptoError::SignatureInvalid` if the artifact is the wrong length,
///   out of range for the modulus, or does not unpad as a block type 1
///   message (wrong key, corruption, or not a signed token at all)
pub fn recover_token(public_key: &RsaPublicKey, signed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let k = public_key.size();
    if signed.len() != k {
        return Err(CryptoError::SignatureInvalid {
            reason: format!("artifact length {} does not match modulus width {k}", signed.len()),
        });
    }

    let c = BigUint::from_bytes_be(signed);
    if &c >= public_key.n() {
        return Err(CryptoError::SignatureInvalid {
            reason: "artifact out of range for modulus".to_string(),
        });
    }

    let m = rsa_encrypt(public_key, &c).map_err(|e| CryptoError::SignatureInvalid {
        reason: format!("RSA operation failed: {e}"),
    })?;
    let em = to_fixed_width(&m, k);

    unpad_block_type_1(&em)
}

/// Strip and validate block type 1 padding, returning the message bytes.
fn unpad_block_type_1(em: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let malformed = || CryptoError::SignatureInvalid {
        reason: "recovered block is not PKCS#1 type 1 padded".to_string(),
    };

    if em.len() < PKCS1_OVERHEAD || em[0] != 0x00 || em[1] != 0x01 {
        return Err(malformed());
    }

    let sep = em[2..].iter().position(|&b| b != 0xFF).ok_or_else(malformed)?;
    if em[2 + sep] != 0x00 || sep < MIN_PAD_LEN {
        return Err(malformed());
    }

    Ok(em[3 + sep..].to_vec())
}

/// Big-endian bytes of `value`, left-padded with zeros to `width`.
fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    debug_assert!(bytes.len() <= width);

    let mut out = vec![0u8; width];
    out[width - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::keys::generate_key_pair;

    const TEST_KEY_BITS: usize = 1024;

    #[test]
    fn sign_recover_roundtrip() {
        let pair = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let token = b"fresh-connection-token";

        let signed = sign_token(&pair.private, token, &mut OsRng).unwrap();
        assert_eq!(signed.len(), pair.private.size());

        let recovered = recover_token(&pair.public, &signed).unwrap();
        assert_eq!(recovered, token);
    }

    #[test]
    fn wrong_public_key_rejects() {
        let signer = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let other = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        let signed = sign_token(&signer.private, b"token", &mut OsRng).unwrap();
        let result = recover_token(&other.public, &signed);
        assert!(matches!(result, Err(CryptoError::SignatureInvalid { .. })));
    }

    #[test]
    fn tampered_artifact_rejects() {
        let pair = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let mut signed = sign_token(&pair.private, b"token", &mut OsRng).unwrap();
        signed[10] ^= 0x01;

        let result = recover_token(&pair.public, &signed);
        assert!(matches!(result, Err(CryptoError::SignatureInvalid { .. })));
    }

    #[test]
    fn wrong_length_artifact_rejects() {
        let pair = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let result = recover_token(&pair.public, b"short");
        assert!(matches!(result, Err(CryptoError::SignatureInvalid { .. })));
    }

    #[test]
    fn oversized_token_rejected_at_signing() {
        let pair = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let too_long = vec![0x41u8; pair.private.size()];

        let result = sign_token(&pair.private, &too_long, &mut OsRng);
        assert!(matches!(result, Err(CryptoError::SigningFailed { .. })));
    }

    #[test]
    fn maximum_length_token_roundtrips() {
        let pair = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let max = vec![0x5Au8; pair.private.size() - PKCS1_OVERHEAD];

        let signed = sign_token(&pair.private, &max, &mut OsRng).unwrap();
        assert_eq!(recover_token(&pair.public, &signed).unwrap(), max);
    }
}
