//! Per-connection handshake driver.
//!
//! Owns one socket and one [`ServerHandshake`], reading frames and
//! executing the actions the state machine returns. All failures are
//! terminal for the connection: the socket is closed and the peer must
//! reconnect to retry.

use std::time::Duration;

use cachet_core::{HandshakeAction, HandshakeOutcome, ServerHandshake, ServerHandshakeState};
use cachet_crypto::KeyPair;
use cachet_proto::{Goodbye, Payload};
use rand::rngs::OsRng;
use tokio::net::TcpStream;

use crate::{
    error::ServerError,
    transport::{read_frame, write_frame},
};

/// Drive one connection's handshake to a terminal state.
///
/// Returns once the handshake reaches `Validated` or `Rejected`, the peer
/// disconnects, or `timeout` elapses waiting for a frame.
///
/// # Errors
///
/// - `ServerError::Timeout` if the peer stalls
/// - `ServerError::Handshake` / `Protocol` / `Transport` on failure; a
///   `Goodbye` with the reason is sent on a best-effort basis first
pub async fn drive(
    mut stream: TcpStream,
    keys: &KeyPair,
    timeout: Duration,
) -> Result<(), ServerError> {
    let mut handshake = ServerHandshake::new();

    loop {
        let frame = match tokio::time::timeout(timeout, read_frame(&mut stream)).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ServerError::Timeout),
        };

        let actions = match handshake.handle_frame(&frame, keys, &mut OsRng) {
            Ok(actions) => actions,
            Err(e) => {
                // Best-effort goodbye; the error is terminal either way
                let goodbye =
                    Payload::Goodbye(Goodbye { reason: e.to_string() }).into_frame()?;
                let _ = write_frame(&mut stream, &goodbye).await;
                return Err(e.into());
            },
        };

        for action in actions {
            match action {
                HandshakeAction::SendFrame(frame) => write_frame(&mut stream, &frame).await?,
                HandshakeAction::Report(HandshakeOutcome::Validated) => {
                    tracing::info!("connection validated");
                },
                HandshakeAction::Report(HandshakeOutcome::Rejected { reason }) => {
                    tracing::warn!(%reason, "connection rejected");
                },
                HandshakeAction::Close { reason } => {
                    tracing::debug!(%reason, "closing connection");
                    return Ok(());
                },
            }
        }

        if handshake.state() == ServerHandshakeState::Validated {
            return Ok(());
        }
    }
}
