//! Cachet client binary.
//!
//! # Usage
//!
//! ```bash
//! cachet-client --server 127.0.0.1:3358 --server-public-key keys/public-key.pem
//! ```
//!
//! Exits zero once the handshake validates; any verification failure exits
//! non-zero without acknowledging the server.

use std::path::PathBuf;

use cachet_client::{Client, ClientConfig};
use cachet_crypto::DEFAULT_KEY_BITS;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Cachet authentication client
#[derive(Parser, Debug)]
#[command(name = "cachet-client")]
#[command(about = "Mutual authentication handshake client")]
#[command(version)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:3358")]
    server: String,

    /// Path to the trusted server public key (PEM)
    #[arg(short = 'k', long)]
    server_public_key: PathBuf,

    /// Modulus size for the ephemeral identity pair
    #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
    key_bits: usize,

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

    let pem = std::fs::read_to_string(&args.server_public_key).map_err(|e| {
        format!("cannot read '{}': {e}", args.server_public_key.display())
    })?;

    let mut config = ClientConfig::new(args.server, pem);
    config.key_bits = args.key_bits;

    let client = Client::connect(config).await?;
    tracing::info!(local = %client.local_addr()?, "validated");

    Ok(())
}
