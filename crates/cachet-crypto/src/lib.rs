//! Cachet Cryptographic Primitives
//!
//! Cryptographic building blocks for Cachet. Pure functions with no I/O;
//! callers supply the random source, which keeps every operation
//! deterministic under test.
//!
//! # Hybrid Scheme
//!
//! A message is encrypted once under a fresh one-time session key, and the
//! session key is wrapped once per recipient under that recipient's RSA
//! public key. The body is never encrypted more than once regardless of
//! recipient count.
//!
//! ```text
//! plaintext ──► AES-256-CBC ──► Envelope (hex IV ‖ hex ciphertext)
//!                   ▲
//!             SessionKey (fresh per message)
//!                   │
//!                   ├─► RSA wrap (recipient A) ──► WrappedKeyPacket A
//!                   ├─► RSA wrap (recipient B) ──► WrappedKeyPacket B
//!                   └─► ...
//! ```
//!
//! # Security
//!
//! Recipient Isolation:
//! - Each packet wraps the session key under a distinct public key
//! - Compromising one recipient's private key exposes only that wrap
//!
//! Freshness:
//! - A new session key and IV are drawn for every message
//! - The CBC mode's no-IV-reuse requirement holds trivially because no key
//!   is ever used twice
//!
//! Known Gaps (kept for wire compatibility, see crate docs of [`envelope`]):
//! - CBC carries no authentication tag; a wrong key or flipped bit can
//!   surface as garbage plaintext instead of a clean error
//! - The recoverable token construction in [`token`] is a signature
//!   realized with encryption primitives, not a dedicated signature scheme

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod error;
pub mod keys;
pub mod token;
pub mod wrap;

pub use envelope::{Envelope, IV_HEX_LEN, SessionKey, open, seal};
pub use error::CryptoError;
pub use keys::{
    DEFAULT_KEY_BITS, KeyPair, generate_key_pair, is_valid_public_key, private_key_from_pem,
    public_key_from_pem,
};
pub use token::{recover_token, sign_token};
pub use wrap::{
    Recipient, WrappedKeyPacket, open_wrapped, seal_for_recipients, unwrap_bytes, wrap_bytes,
};

pub use rsa::{RsaPrivateKey, RsaPublicKey};
