//! Cachet server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start with keys in ./keys (generated on first run)
//! cachet-server --bind 0.0.0.0:3358 --key-dir keys
//! ```

use std::{path::PathBuf, time::Duration};

use cachet_server::{DEFAULT_HANDSHAKE_TIMEOUT, Server, ServerConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Cachet authentication server
#[derive(Parser, Debug)]
#[command(name = "cachet-server")]
#[command(about = "Mutual authentication handshake server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:3358")]
    bind: String,

    /// Directory holding the server key pair (generated if absent)
    #[arg(short, long, default_value = "keys")]
    key_dir: PathBuf,

    /// Handshake timeout in seconds
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT.as_secs())]
    handshake_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("cachet server starting");

    let config = ServerConfig {
        bind_address: args.bind,
        key_dir: args.key_dir,
        handshake_timeout: Duration::from_secs(args.handshake_timeout),
    };

    let server = Server::bind(config).await?;
    tracing::info!("listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
