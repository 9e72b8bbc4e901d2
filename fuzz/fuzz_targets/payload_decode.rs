//! Fuzz target for Payload::decode
//!
//! Throws malformed CBOR at every opcode's payload type: truncated bodies,
//! type confusion (bytes meant for one opcode decoded under another),
//! oversized strings. Must never panic; bad input is an error.

#![no_main]

use cachet_proto::{Opcode, Payload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let opcodes = [
        Opcode::ClientHello,
        Opcode::TokenIssue,
        Opcode::ValidateResult,
        Opcode::Validated,
        Opcode::Goodbye,
    ];

    for opcode in opcodes {
        let _ = Payload::decode(opcode, data);
    }
});
