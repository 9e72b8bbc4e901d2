//! Client role of the authentication handshake.
//!
//! The client verifies two things from a single `TokenIssue` frame: that
//! the token recovers under the *known* server public key (server identity)
//! and that the challenge decrypts under its own private key to the same
//! value (the server addressed this specific client). Verification order
//! matters: a bad server signature aborts before any further message is
//! sent.

use cachet_crypto::{KeyPair, RsaPublicKey, recover_token, unwrap_bytes};
use cachet_proto::{ClientHello, Frame, Opcode, Payload, ValidateResult};

use crate::{HandshakeAction, HandshakeOutcome, error::HandshakeError};

/// Client handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientHandshakeState {
    /// Connected; hello not yet acknowledged with a token.
    Connected,
    /// Token frame received and being verified.
    TokenReceived,
    /// Both proofs verified; connection trusted.
    Validated,
    /// Handshake failed; connection must be torn down.
    Disconnected,
}

impl ClientHandshakeState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::TokenReceived => "TokenReceived",
            Self::Validated => "Validated",
            Self::Disconnected => "Disconnected",
        }
    }
}

/// Per-connection client handshake state machine.
///
/// Owns the client's identity pair and the server public key it was
/// configured to trust. Pure logic, no I/O; the driver executes returned
/// actions. Any `Err` is terminal - the machine moves to
/// [`ClientHandshakeState::Disconnected`] and the driver must close the
/// connection *without sending anything further*.
#[derive(Debug)]
pub struct ClientHandshake {
    /// Current state.
    state: ClientHandshakeState,

    /// This client's long-lived identity pair.
    keys: KeyPair,

    /// The server public key this client trusts.
    server_public_key: RsaPublicKey,

    /// Guards against emitting a second hello on the same connection.
    hello_sent: bool,
}

impl ClientHandshake {
    /// Create a handshake in [`ClientHandshakeState::Connected`].
    #[must_use]
    pub fn new(keys: KeyPair, server_public_key: RsaPublicKey) -> Self {
        Self { state: ClientHandshakeState::Connected, keys, server_public_key, hello_sent: false }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientHandshakeState {
        self.state
    }

    /// Announce our public key to the server. Call once, on connect.
    ///
    /// # Errors
    ///
    /// - `HandshakeError::InvalidState` if called twice or after failure
    /// - `HandshakeError::Crypto` if the public key cannot be PEM-encoded
    pub fn start(&mut self) -> Result<Vec<HandshakeAction>, HandshakeError> {
        if self.state != ClientHandshakeState::Connected || self.hello_sent {
            return Err(HandshakeError::InvalidState {
                state: self.state.as_str(),
                operation: "start",
            });
        }

        let hello = Payload::ClientHello(ClientHello { public_key_pem: self.keys.public_key_pem()? });
        let frame = hello.into_frame()?;
        self.hello_sent = true;

        Ok(vec![HandshakeAction::SendFrame(frame)])
    }

    /// Process an incoming frame.
    ///
    /// # Errors
    ///
    /// - `HandshakeError::SignatureInvalid` if the signed token does not
    ///   recover under the known server key
    /// - `HandshakeError::ChallengeDecryptFailed` if the challenge does not
    ///   decrypt under our private key
    /// - `HandshakeError::ChallengeMismatch` if the two recovered values
    ///   differ
    /// - `HandshakeError::UnexpectedFrame` for opcodes illegal in the
    ///   current state
    ///
    /// All errors leave the machine in `Disconnected`; no acknowledgment is
    /// sent on any failure path.
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<HandshakeAction>, HandshakeError> {
        match (self.state, frame.opcode) {
            (ClientHandshakeState::Connected, Opcode::TokenIssue) => {
                self.state = ClientHandshakeState::TokenReceived;

                let issue = match Payload::from_frame(frame) {
                    Ok(Payload::TokenIssue(issue)) => issue,
                    Ok(_) | Err(_) => return self.disconnect(HandshakeError::Protocol(
                        cachet_proto::ProtocolError::CborDecode("malformed TokenIssue".into()),
                    )),
                };

                // Proof 1: the token originates from the server's private key
                let Ok(token) = recover_token(&self.server_public_key, &issue.signed_token) else {
                    return self.disconnect(HandshakeError::SignatureInvalid);
                };

                // Proof 2: the challenge was bound to our public key
                let Ok(challenge) = unwrap_bytes(&self.keys.private, &issue.challenge) else {
                    return self.disconnect(HandshakeError::ChallengeDecryptFailed);
                };

                // Proof 3: both proofs carry the same value, so the server
                // addressed this specific client
                if challenge != token {
                    return self.disconnect(HandshakeError::ChallengeMismatch);
                }

                self.state = ClientHandshakeState::Validated;
                let verdict = Payload::ValidateResult(ValidateResult { ok: true }).into_frame()?;

                Ok(vec![
                    HandshakeAction::Report(HandshakeOutcome::Validated),
                    HandshakeAction::SendFrame(verdict),
                ])
            },

            (ClientHandshakeState::Validated, Opcode::Validated) => {
                // Server acknowledgment; outcome was already reported
                Ok(vec![])
            },

            (_, Opcode::Goodbye) => {
                self.state = ClientHandshakeState::Disconnected;

                let reason = match Payload::from_frame(frame) {
                    Ok(Payload::Goodbye(goodbye)) => format!("peer goodbye: {}", goodbye.reason),
                    _ => "peer goodbye".to_string(),
                };

                Ok(vec![HandshakeAction::Close { reason }])
            },

            (state, opcode) => self.disconnect(HandshakeError::UnexpectedFrame {
                state: state.as_str(),
                opcode: opcode.to_u8(),
            }),
        }
    }

    /// Move to `Disconnected` and surface the error. The driver must close
    /// without sending further messages.
    fn disconnect<T>(&mut self, err: HandshakeError) -> Result<T, HandshakeError> {
        self.state = ClientHandshakeState::Disconnected;
        Err(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cachet_crypto::{generate_key_pair, sign_token, wrap_bytes};
    use cachet_proto::TokenIssue;
    use rand::rngs::OsRng;

    use super::*;

    const TEST_KEY_BITS: usize = 1024;

    fn issue_frame(signed_token: Vec<u8>, challenge: Vec<u8>) -> Frame {
        Payload::TokenIssue(TokenIssue { signed_token, challenge }).into_frame().unwrap()
    }

    #[test]
    fn start_emits_client_hello_once() {
        let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let mut hs = ClientHandshake::new(client, server.public);

        let actions = hs.start().unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], HandshakeAction::SendFrame(f) if f.opcode == Opcode::ClientHello));

        assert!(matches!(hs.start(), Err(HandshakeError::InvalidState { .. })));
    }

    #[test]
    fn matching_proofs_validate() {
        let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let mut hs = ClientHandshake::new(client.clone(), server.public.clone());
        hs.start().unwrap();

        let token = b"0123456789abcdef0123456789abcdef";
        let signed = sign_token(&server.private, token, &mut OsRng).unwrap();
        let challenge = wrap_bytes(&client.public, token, &mut OsRng).unwrap();

        let actions = hs.handle_frame(&issue_frame(signed, challenge)).unwrap();

        assert_eq!(hs.state(), ClientHandshakeState::Validated);
        assert!(matches!(&actions[0], HandshakeAction::Report(HandshakeOutcome::Validated)));
        assert!(matches!(&actions[1], HandshakeAction::SendFrame(f) if f.opcode == Opcode::ValidateResult));
    }

    #[test]
    fn wrong_server_key_fails_signature_check() {
        let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let imposter = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        // Client trusts `server`, but the token was signed by `imposter`
        let mut hs = ClientHandshake::new(client.clone(), server.public);
        hs.start().unwrap();

        let token = b"fresh-token";
        let signed = sign_token(&imposter.private, token, &mut OsRng).unwrap();
        let challenge = wrap_bytes(&client.public, token, &mut OsRng).unwrap();

        let result = hs.handle_frame(&issue_frame(signed, challenge));
        assert_eq!(result, Err(HandshakeError::SignatureInvalid));
        assert_eq!(hs.state(), ClientHandshakeState::Disconnected);
    }

    #[test]
    fn challenge_for_another_client_fails_decrypt() {
        let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let other = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        let mut hs = ClientHandshake::new(client, server.public.clone());
        hs.start().unwrap();

        let token = b"fresh-token";
        let signed = sign_token(&server.private, token, &mut OsRng).unwrap();
        // Challenge bound to a different client's key
        let challenge = wrap_bytes(&other.public, token, &mut OsRng).unwrap();

        let result = hs.handle_frame(&issue_frame(signed, challenge));
        assert_eq!(result, Err(HandshakeError::ChallengeDecryptFailed));
        assert_eq!(hs.state(), ClientHandshakeState::Disconnected);
    }

    #[test]
    fn differing_values_fail_comparison() {
        let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

        let mut hs = ClientHandshake::new(client.clone(), server.public.clone());
        hs.start().unwrap();

        let signed = sign_token(&server.private, b"token-one", &mut OsRng).unwrap();
        let challenge = wrap_bytes(&client.public, b"token-two", &mut OsRng).unwrap();

        let result = hs.handle_frame(&issue_frame(signed, challenge));
        assert_eq!(result, Err(HandshakeError::ChallengeMismatch));
        assert_eq!(hs.state(), ClientHandshakeState::Disconnected);
    }

    #[test]
    fn token_before_start_still_verifies_state() {
        let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
        let mut hs = ClientHandshake::new(client, server.public);

        let verdict = Payload::Validated.into_frame().unwrap();
        let result = hs.handle_frame(&verdict);
        assert!(matches!(result, Err(HandshakeError::UnexpectedFrame { .. })));
        assert_eq!(hs.state(), ClientHandshakeState::Disconnected);
    }
}
