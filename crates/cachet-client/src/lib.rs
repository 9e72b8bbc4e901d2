//! Cachet client.
//!
//! Connects to a cachet server, announces a fresh identity key, and
//! verifies the server's token proofs before trusting the connection. The
//! state machine lives in [`cachet_core`]; this crate supplies the Tokio
//! TCP driver around it.
//!
//! # Failure policy
//!
//! Any verification failure closes the socket *without sending anything*:
//! an unauthenticated peer learns only that the client went away, not
//! which proof failed.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod transport;

use std::time::Duration;

use cachet_core::{
    ClientHandshake, ClientHandshakeState, HandshakeAction, HandshakeOutcome,
};
use cachet_crypto::{DEFAULT_KEY_BITS, KeyPair, generate_key_pair, public_key_from_pem};
use cachet_proto::Opcode;
use rand::rngs::OsRng;
use tokio::net::TcpStream;

pub use crate::error::ClientError;
use crate::transport::{read_frame, write_frame};

/// Time allowed for the server to complete the handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Client runtime configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub server_address: String,
    /// PEM text of the server public key this client trusts.
    pub server_public_key_pem: String,
    /// Modulus size for the ephemeral identity pair.
    pub key_bits: usize,
    /// Handshake timeout.
    pub handshake_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default key size and timeout.
    #[must_use]
    pub fn new(server_address: impl Into<String>, server_public_key_pem: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            server_public_key_pem: server_public_key_pem.into(),
            key_bits: DEFAULT_KEY_BITS,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// A connection that has completed mutual authentication.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    keys: KeyPair,
}

impl Client {
    /// Connect, run the handshake to completion, and return a validated
    /// connection.
    ///
    /// Generates a fresh identity pair for this connection.
    ///
    /// # Errors
    ///
    /// - `ClientError::Config` if the trusted key does not parse or the
    ///   server is unreachable
    /// - `ClientError::Handshake` if any verification proof fails
    /// - `ClientError::Rejected` if the server closes the handshake
    /// - `ClientError::Timeout` if the server stalls
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let server_public_key = public_key_from_pem(&config.server_public_key_pem)?;

        tracing::debug!(bits = config.key_bits, "generating identity pair");
        let keys = generate_key_pair(&mut OsRng, config.key_bits)
            .map_err(|e| ClientError::Config(format!("key generation failed: {e}")))?;

        let mut stream = TcpStream::connect(&config.server_address).await.map_err(|e| {
            ClientError::Config(format!("cannot connect '{}': {e}", config.server_address))
        })?;

        tracing::debug!(addr = %config.server_address, "connected, starting handshake");

        let mut handshake = ClientHandshake::new(keys.clone(), server_public_key);
        Self::execute(&mut stream, handshake.start()?).await?;

        loop {
            let frame =
                match tokio::time::timeout(config.handshake_timeout, read_frame(&mut stream)).await
                {
                    Ok(Ok(frame)) => frame,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => return Err(ClientError::Timeout),
                };
            let opcode = frame.opcode;

            // On any handshake error the socket is dropped silently; the
            // failure policy forbids acknowledging an unverified peer
            let actions = handshake.handle_frame(&frame)?;
            Self::execute(&mut stream, actions).await?;

            if handshake.state() == ClientHandshakeState::Validated && opcode == Opcode::Validated {
                tracing::info!("handshake complete, connection validated");
                return Ok(Self { stream, keys });
            }
        }
    }

    /// This connection's identity key pair.
    #[must_use]
    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    /// Local address of the underlying socket.
    ///
    /// # Errors
    ///
    /// - `ClientError::Transport` if the socket is gone
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ClientError> {
        self.stream
            .local_addr()
            .map_err(|e| ClientError::Transport(format!("local_addr failed: {e}")))
    }

    async fn execute(
        stream: &mut TcpStream,
        actions: Vec<HandshakeAction>,
    ) -> Result<(), ClientError> {
        for action in actions {
            match action {
                HandshakeAction::SendFrame(frame) => write_frame(stream, &frame).await?,
                HandshakeAction::Report(HandshakeOutcome::Validated) => {
                    tracing::info!("server identity verified");
                },
                HandshakeAction::Report(HandshakeOutcome::Rejected { reason }) => {
                    tracing::warn!(%reason, "handshake rejected");
                },
                HandshakeAction::Close { reason } => {
                    return Err(ClientError::Rejected { reason });
                },
            }
        }
        Ok(())
    }
}
