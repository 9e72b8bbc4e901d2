//! Server role of the authentication handshake.
//!
//! One `ServerHandshake` per connection. The token is generated fresh for
//! every connection attempt and lives only inside this struct - never in a
//! process-wide slot - so concurrent handshakes cannot observe or clobber
//! each other's proofs.

use cachet_crypto::{KeyPair, RsaPublicKey, keys, sign_token, wrap_bytes};
use cachet_proto::{Frame, Opcode, Payload, TokenIssue};
use rand::{CryptoRng, RngCore};

use crate::{HandshakeAction, HandshakeOutcome, error::HandshakeError};

/// Number of random bytes behind each connection token.
const TOKEN_LEN: usize = 32;

/// Server handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerHandshakeState {
    /// Waiting for the client's claimed public key.
    AwaitClientKey,
    /// Token and challenge sent, waiting for the client's verdict.
    TokenIssued,
    /// Client verified both proofs; connection trusted.
    Validated,
    /// Handshake failed; connection must be torn down.
    Rejected,
}

impl ServerHandshakeState {
    fn as_str(self) -> &'static str {
        match self {
            Self::AwaitClientKey => "AwaitClientKey",
            Self::TokenIssued => "TokenIssued",
            Self::Validated => "Validated",
            Self::Rejected => "Rejected",
        }
    }
}

/// Per-connection server handshake state machine.
///
/// Pure logic: no I/O and no logging. The driver feeds in decoded frames
/// and executes the returned actions. Any `Err` is terminal - the machine
/// moves to [`ServerHandshakeState::Rejected`] and the driver must close
/// the connection.
#[derive(Debug)]
pub struct ServerHandshake {
    /// Current state.
    state: ServerHandshakeState,

    /// Token issued to this connection, kept for the connection's lifetime
    /// only. Fresh randomness per connection; never reused across sessions.
    token: Option<String>,

    /// The client's validated public key, once received.
    client_public_key: Option<RsaPublicKey>,
}

impl Default for ServerHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerHandshake {
    /// Create a handshake in [`ServerHandshakeState::AwaitClientKey`].
    #[must_use]
    pub fn new() -> Self {
        Self { state: ServerHandshakeState::AwaitClientKey, token: None, client_public_key: None }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ServerHandshakeState {
        self.state
    }

    /// The client's public key, once a well-formed `ClientHello` arrived.
    #[must_use]
    pub fn client_public_key(&self) -> Option<&RsaPublicKey> {
        self.client_public_key.as_ref()
    }

    /// Process an incoming frame.
    ///
    /// `keys` is the server's long-lived identity pair (read-only); `rng`
    /// supplies token randomness and RSA blinding.
    ///
    /// # Errors
    ///
    /// - `HandshakeError::InvalidClientKey` if the claimed key is malformed
    ///   (no token is issued)
    /// - `HandshakeError::UnexpectedFrame` if the opcode is illegal for the
    ///   current state
    /// - `HandshakeError::Protocol` / `Crypto` on codec or RSA failure
    ///
    /// All errors leave the machine in `Rejected`.
    pub fn handle_frame<R: CryptoRng + RngCore>(
        &mut self,
        frame: &Frame,
        keys: &KeyPair,
        rng: &mut R,
    ) -> Result<Vec<HandshakeAction>, HandshakeError> {
        match (self.state, frame.opcode) {
            (ServerHandshakeState::AwaitClientKey, Opcode::ClientHello) => {
                let payload = match Payload::from_frame(frame) {
                    Ok(Payload::ClientHello(hello)) => hello,
                    Ok(_) | Err(_) => return self.reject(HandshakeError::Protocol(
                        cachet_proto::ProtocolError::CborDecode("malformed ClientHello".into()),
                    )),
                };

                // Validate at the boundary; a bad key never reaches the
                // signing path.
                let Ok(client_key) = keys::public_key_from_pem(&payload.public_key_pem) else {
                    return self.reject(HandshakeError::InvalidClientKey);
                };

                let mut token_bytes = [0u8; TOKEN_LEN];
                rng.fill_bytes(&mut token_bytes);
                let token = hex::encode(token_bytes);

                let signed_token = match sign_token(&keys.private, token.as_bytes(), rng) {
                    Ok(signed) => signed,
                    Err(e) => return self.reject(e.into()),
                };
                let challenge = match wrap_bytes(&client_key, token.as_bytes(), rng) {
                    Ok(challenge) => challenge,
                    Err(e) => return self.reject(e.into()),
                };

                let issue = Payload::TokenIssue(TokenIssue { signed_token, challenge });
                let frame = issue.into_frame()?;

                self.token = Some(token);
                self.client_public_key = Some(client_key);
                self.state = ServerHandshakeState::TokenIssued;

                Ok(vec![HandshakeAction::SendFrame(frame)])
            },

            (ServerHandshakeState::TokenIssued, Opcode::ValidateResult) => {
                let result = match Payload::from_frame(frame) {
                    Ok(Payload::ValidateResult(result)) => result,
                    Ok(_) | Err(_) => return self.reject(HandshakeError::Protocol(
                        cachet_proto::ProtocolError::CborDecode("malformed ValidateResult".into()),
                    )),
                };

                if result.ok {
                    self.state = ServerHandshakeState::Validated;
                    let ack = Payload::Validated.into_frame()?;

                    Ok(vec![
                        HandshakeAction::SendFrame(ack),
                        HandshakeAction::Report(HandshakeOutcome::Validated),
                    ])
                } else {
                    self.state = ServerHandshakeState::Rejected;
                    let reason = "client reported verification failure".to_string();

                    Ok(vec![
                        HandshakeAction::Report(HandshakeOutcome::Rejected {
                            reason: reason.clone(),
                        }),
                        HandshakeAction::Close { reason },
                    ])
                }
            },

            (_, Opcode::Goodbye) => {
                self.state = ServerHandshakeState::Rejected;

                let reason = match Payload::from_frame(frame) {
                    Ok(Payload::Goodbye(goodbye)) => format!("peer goodbye: {}", goodbye.reason),
                    _ => "peer goodbye".to_string(),
                };

                Ok(vec![HandshakeAction::Close { reason }])
            },

            (state, opcode) => self.reject(HandshakeError::UnexpectedFrame {
                state: state.as_str(),
                opcode: opcode.to_u8(),
            }),
        }
    }

    /// Move to `Rejected` and surface the error. Failures are terminal for
    /// the connection attempt.
    fn reject<T>(&mut self, err: HandshakeError) -> Result<T, HandshakeError> {
        self.state = ServerHandshakeState::Rejected;
        Err(err)
    }
}
