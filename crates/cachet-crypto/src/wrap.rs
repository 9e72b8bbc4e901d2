//! Session key wrapping for multi-recipient delivery.
//!
//! The hybrid path: the body is encrypted once under a fresh session key,
//! then that same key is RSA-wrapped once per recipient. N recipients cost
//! one symmetric encryption and N small asymmetric operations, never N
//! encryptions of the full message.

use rand::{CryptoRng, RngCore};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::{
    envelope::{Envelope, SessionKey, open, seal},
    error::CryptoError,
    keys::public_key_from_pem,
};

/// A validated message recipient.
///
/// Construction via [`Recipient::new`] parses the PEM at the boundary, so a
/// recipient that exists is always backed by a structurally valid key.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Caller-assigned identifier carried through to the packet.
    pub id: String,
    /// The recipient's RSA public key.
    pub public_key: RsaPublicKey,
}

impl Recipient {
    /// Build a recipient from an id and a PEM-encoded public key.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidKeyFormat` if the PEM does not parse
    pub fn new(id: impl Into<String>, public_key_pem: &str) -> Result<Self, CryptoError> {
        Ok(Self { id: id.into(), public_key: public_key_from_pem(public_key_pem)? })
    }

    /// Build a recipient from an already-parsed key.
    #[must_use]
    pub fn from_key(id: impl Into<String>, public_key: RsaPublicKey) -> Self {
        Self { id: id.into(), public_key }
    }
}

/// One recipient's copy of the session key plus the shared envelope.
///
/// Packets are independent: compromising one recipient's private key
/// exposes only that recipient's wrap, not the others'.
#[derive(Debug, Clone)]
pub struct WrappedKeyPacket {
    /// Which recipient this wrap is for.
    pub recipient_id: String,
    /// The session key, RSA-encrypted under this recipient's public key.
    pub wrapped_key: Vec<u8>,
    /// The shared ciphertext envelope (identical across all packets).
    pub envelope: Envelope,
}

impl WrappedKeyPacket {
    /// Unwrap and decrypt with the matching private key.
    ///
    /// # Errors
    ///
    /// - `CryptoError::AsymmetricUnwrapFailure` with the wrong private key
    /// - `CryptoError::SymmetricDecryptFailure` if the body does not decrypt
    pub fn open(&self, private_key: &RsaPrivateKey) -> Result<String, CryptoError> {
        open_wrapped(&self.envelope, private_key, &self.wrapped_key)
    }
}

/// Encrypt a message once and wrap the session key for every recipient.
///
/// The returned packets all reference the same envelope; only the wrapped
/// key differs. An empty recipient list yields an empty vec (the message is
/// still encrypted, then discarded with its key).
///
/// # Errors
///
/// - `CryptoError::InvalidKeyFormat` if a recipient's key modulus is too
///   small to wrap a 32-byte session key
pub fn seal_for_recipients<R: CryptoRng + RngCore>(
    message: Option<&str>,
    recipients: &[Recipient],
    rng: &mut R,
) -> Result<Vec<WrappedKeyPacket>, CryptoError> {
    let (session_key, envelope) = seal(message, rng);

    let mut packets = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let wrapped_key = wrap_bytes(&recipient.public_key, session_key.as_bytes(), rng)?;

        packets.push(WrappedKeyPacket {
            recipient_id: recipient.id.clone(),
            wrapped_key,
            envelope: envelope.clone(),
        });
    }

    Ok(packets)
}

/// Unwrap a session key with a private key, then decrypt the envelope.
///
/// # Errors
///
/// - `CryptoError::AsymmetricUnwrapFailure` if the RSA unwrap fails (wrong
///   private key or corrupt wrapped key) or yields a wrong-length key
/// - `CryptoError::SymmetricDecryptFailure` if the envelope does not
///   decrypt under the recovered key
pub fn open_wrapped(
    envelope: &Envelope,
    private_key: &RsaPrivateKey,
    wrapped_key: &[u8],
) -> Result<String, CryptoError> {
    let key_bytes = unwrap_bytes(private_key, wrapped_key)?;
    let session_key = SessionKey::try_from_slice(&key_bytes)?;
    open(envelope, &session_key)
}

/// Encrypt a small byte string under a public key (PKCS#1 v1.5).
///
/// Used for session key wraps and for the handshake's client-bound
/// challenge. The payload must fit the modulus minus padding overhead.
///
/// # Errors
///
/// - `CryptoError::InvalidKeyFormat` if the payload does not fit the key
pub fn wrap_bytes<R: CryptoRng + RngCore>(
    public_key: &RsaPublicKey,
    bytes: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    public_key.encrypt(rng, Pkcs1v15Encrypt, bytes).map_err(|e| CryptoError::InvalidKeyFormat {
        reason: format!("payload of {} bytes cannot be wrapped under this key: {e}", bytes.len()),
    })
}

/// Decrypt a wrapped byte string with the matching private key.
///
/// # Errors
///
/// - `CryptoError::AsymmetricUnwrapFailure` with the wrong private key or
///   corrupt input
pub fn unwrap_bytes(private_key: &RsaPrivateKey, wrapped: &[u8]) -> Result<Vec<u8>, CryptoError> {
    private_key.decrypt(Pkcs1v15Encrypt, wrapped).map_err(|e| {
        CryptoError::AsymmetricUnwrapFailure { reason: format!("RSA decrypt failed: {e}") }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::keys::generate_key_pair;

    const TEST_KEY_BITS: usize = 1024;

    #[test]
    fn each_recipient_recovers_the_same_plaintext() {
        let alice = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let bob = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        let recipients = vec![
            Recipient::from_key("alice", alice.public.clone()),
            Recipient::from_key("bob", bob.public.clone()),
        ];

        let packets =
            seal_for_recipients(Some("group announcement"), &recipients, &mut OsRng).unwrap();
        assert_eq!(packets.len(), 2);

        assert_eq!(packets[0].open(&alice.private).unwrap(), "group announcement");
        assert_eq!(packets[1].open(&bob.private).unwrap(), "group announcement");
    }

    #[test]
    fn packets_share_one_envelope_but_distinct_wraps() {
        let alice = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let bob = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        let recipients = vec![
            Recipient::from_key("alice", alice.public),
            Recipient::from_key("bob", bob.public),
        ];

        let packets = seal_for_recipients(Some("hi"), &recipients, &mut OsRng).unwrap();

        // One symmetric encryption shared by all packets
        assert_eq!(packets[0].envelope, packets[1].envelope);
        assert_ne!(packets[0].wrapped_key, packets[1].wrapped_key);
        assert_eq!(packets[0].recipient_id, "alice");
        assert_eq!(packets[1].recipient_id, "bob");
    }

    #[test]
    fn wrong_private_key_cannot_unwrap() {
        let alice = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let bob = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        let recipients = vec![Recipient::from_key("alice", alice.public)];
        let packets = seal_for_recipients(Some("for alice only"), &recipients, &mut OsRng).unwrap();

        let result = packets[0].open(&bob.private);
        assert!(matches!(result, Err(CryptoError::AsymmetricUnwrapFailure { .. })));
    }

    #[test]
    fn corrupt_wrapped_key_fails_unwrap() {
        let alice = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let recipients = vec![Recipient::from_key("alice", alice.public)];
        let mut packets = seal_for_recipients(Some("msg"), &recipients, &mut OsRng).unwrap();

        let last = packets[0].wrapped_key.len() - 1;
        packets[0].wrapped_key[last] ^= 0xFF;

        let result = packets[0].open(&alice.private);
        assert!(matches!(result, Err(CryptoError::AsymmetricUnwrapFailure { .. })));
    }

    #[test]
    fn no_recipients_yields_no_packets() {
        let packets = seal_for_recipients(Some("nobody home"), &[], &mut OsRng).unwrap();
        assert!(packets.is_empty());
    }

    #[test]
    fn recipient_construction_validates_pem() {
        let pair = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let pem = pair.public_key_pem().unwrap();

        assert!(Recipient::new("ok", &pem).is_ok());
        assert!(matches!(
            Recipient::new("bad", "not-a-key"),
            Err(CryptoError::InvalidKeyFormat { .. })
        ));
    }
}
