//! Cachet production server.
//!
//! Production glue wrapping [`cachet_core`]'s action-based handshake logic
//! with real I/O: Tokio TCP transport, PEM key persistence, and tracing.
//! The state machines stay pure; this crate executes their actions.
//!
//! # Components
//!
//! - [`Server`]: accept loop, one task per connection
//! - [`connection`]: drives a [`cachet_core::ServerHandshake`] over a socket
//! - [`keystore`]: loads or generates the server's PEM key pair
//! - [`transport`]: frame read/write over any async byte stream

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod error;
pub mod keystore;
pub mod transport;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use cachet_crypto::KeyPair;
use tokio::net::TcpListener;

pub use crate::error::ServerError;

/// Time allowed for a peer to complete the handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Server runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_address: String,
    /// Directory holding (or receiving) the server's PEM key pair.
    pub key_dir: PathBuf,
    /// Handshake timeout per connection.
    pub handshake_timeout: Duration,
}

/// TCP server accepting handshake connections.
pub struct Server {
    listener: TcpListener,
    keys: Arc<KeyPair>,
    handshake_timeout: Duration,
}

impl Server {
    /// Bind the listener and load (or generate) the server key pair.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if the bind address is invalid
    /// - `ServerError::Keystore` if key material cannot be loaded or
    ///   persisted
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let keys = keystore::load_or_generate(&config.key_dir)?;

        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Config(format!("cannot bind '{}': {e}", config.bind_address))
        })?;

        tracing::info!(addr = %config.bind_address, "listener bound");

        Ok(Self { listener, keys: Arc::new(keys), handshake_timeout: config.handshake_timeout })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("local_addr failed: {e}")))
    }

    /// Accept connections forever, one handshake task per connection.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if the listener itself fails
    pub async fn run(&self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))?;

            tracing::debug!(%peer, "connection accepted");

            let keys = Arc::clone(&self.keys);
            let timeout = self.handshake_timeout;
            tokio::spawn(async move {
                if let Err(e) = connection::drive(stream, &keys, timeout).await {
                    tracing::warn!(%peer, error = %e, "handshake failed");
                }
            });
        }
    }
}
