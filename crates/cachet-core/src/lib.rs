//! Cachet Handshake Core
//!
//! Mutual authentication between a client and a server over RSA key pairs,
//! with no pre-shared secret. Both roles are pure, sans-IO state machines
//! using the action pattern: methods take frames and return actions for the
//! driver to execute. No sockets, no logging, no clocks in here.
//!
//! # Protocol
//!
//! ```text
//! ┌────────────────┐ ClientHello ┌─────────────┐ ValidateResult ┌───────────┐
//! │ AwaitClientKey │────────────>│ TokenIssued │───────────────>│ Validated │
//! └────────────────┘             └─────────────┘                └───────────┘
//!         │ invalid key                 │ ok=false / bad frame
//!         ↓                             ↓
//!    ┌──────────┐                  ┌──────────┐
//!    │ Rejected │                  │ Rejected │
//!    └──────────┘                  └──────────┘
//! ```
//!
//! The server proves possession of its private key by signing a fresh token
//! recoverably; the client proves possession of its private key by
//! decrypting a challenge bound to its public key; equality of the two
//! recovered values proves the server addressed this specific client.
//!
//! # Failure policy
//!
//! Every cryptographic failure is terminal for the connection attempt.
//! Nothing is retried and no partial-trust state survives; the peer must
//! reconnect and start over.
//!
//! # Concurrency
//!
//! Each connection owns its own state machine and token. The only shared
//! input is the principal's long-lived key pair, which is read-only after
//! load. Independent handshakes need no coordination.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod server;

pub use client::{ClientHandshake, ClientHandshakeState};
pub use error::HandshakeError;
pub use server::{ServerHandshake, ServerHandshakeState};

use cachet_proto::Frame;

/// Actions returned by the handshake state machines.
///
/// The driver (production transport or test harness) executes these:
/// send the frame, report the outcome to the application, close the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Send this frame to the peer.
    SendFrame(Frame),

    /// Surface a terminal outcome to the application.
    Report(HandshakeOutcome),

    /// Close the connection with this reason.
    Close {
        /// Reason for closing, safe to log.
        reason: String,
    },
}

/// Terminal handshake outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Both proofs verified; the connection is trusted.
    Validated,

    /// The peer failed or refused verification.
    Rejected {
        /// Why the handshake was rejected.
        reason: String,
    },
}
