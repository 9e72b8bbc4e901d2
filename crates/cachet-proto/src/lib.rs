//! Cachet Wire Protocol
//!
//! Frames and payloads for the mutual authentication handshake. A frame is
//! a fixed 10-byte binary header (Big Endian) followed by a CBOR-encoded
//! payload. The header carries the opcode, so payloads serialize without a
//! variant tag; opcode and payload type are bound one-to-one.
//!
//! The protocol itself is four messages per connection:
//!
//! ```text
//! client                                server
//!   │ ── ClientHello { public_key_pem } ──► │
//!   │ ◄── TokenIssue { signed, challenge } ─│
//!   │ ── ValidateResult { ok } ───────────► │
//!   │ ◄── Validated ────────────────────────│
//! ```
//!
//! Either side may send `Goodbye { reason }` at any point to terminate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frame;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::{Frame, Opcode};
pub use payloads::{ClientHello, Goodbye, Payload, TokenIssue, ValidateResult};
