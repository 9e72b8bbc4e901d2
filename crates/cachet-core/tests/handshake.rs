//! End-to-end handshake exchange between both state machines.
//!
//! Drives a client and a server machine against each other by passing
//! frames directly, no sockets. This is the loopback equivalent of what the
//! production drivers do over TCP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cachet_core::{
    ClientHandshake, ClientHandshakeState, HandshakeAction, HandshakeError, HandshakeOutcome,
    ServerHandshake, ServerHandshakeState,
};
use cachet_crypto::{KeyPair, generate_key_pair};
use cachet_proto::{Frame, Opcode, Payload};
use rand::rngs::OsRng;

const TEST_KEY_BITS: usize = 1024;

fn key_pairs() -> (KeyPair, KeyPair) {
    let server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
    let client = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();
    (server, client)
}

fn sent_frame(actions: &[HandshakeAction]) -> Frame {
    actions
        .iter()
        .find_map(|a| match a {
            HandshakeAction::SendFrame(frame) => Some(frame.clone()),
            _ => None,
        })
        .expect("expected a SendFrame action")
}

#[test]
fn full_handshake_validates_both_sides() {
    let (server_keys, client_keys) = key_pairs();
    let mut server = ServerHandshake::new();
    let mut client = ClientHandshake::new(client_keys, server_keys.public.clone());

    // client -> server: ClientHello
    let hello = sent_frame(&client.start().unwrap());

    // server -> client: TokenIssue
    let issue_actions = server.handle_frame(&hello, &server_keys, &mut OsRng).unwrap();
    let issue = sent_frame(&issue_actions);
    assert_eq!(issue.opcode, Opcode::TokenIssue);

    // client -> server: ValidateResult { ok: true }
    let verdict_actions = client.handle_frame(&issue).unwrap();
    assert!(verdict_actions.contains(&HandshakeAction::Report(HandshakeOutcome::Validated)));
    let verdict = sent_frame(&verdict_actions);

    // server -> client: Validated
    let ack_actions = server.handle_frame(&verdict, &server_keys, &mut OsRng).unwrap();
    assert!(ack_actions.contains(&HandshakeAction::Report(HandshakeOutcome::Validated)));
    let ack = sent_frame(&ack_actions);

    assert!(client.handle_frame(&ack).unwrap().is_empty());

    assert_eq!(server.state(), ServerHandshakeState::Validated);
    assert_eq!(client.state(), ClientHandshakeState::Validated);
}

#[test]
fn corrupted_challenge_never_validates() {
    let (server_keys, client_keys) = key_pairs();
    let mut server = ServerHandshake::new();
    let mut client = ClientHandshake::new(client_keys, server_keys.public.clone());

    let hello = sent_frame(&client.start().unwrap());
    let issue = sent_frame(&server.handle_frame(&hello, &server_keys, &mut OsRng).unwrap());

    // Flip one byte of the challenge in transit
    let Payload::TokenIssue(mut inner) = Payload::from_frame(&issue).unwrap() else {
        panic!("expected TokenIssue");
    };
    inner.challenge[0] ^= 0x01;
    let tampered = Payload::TokenIssue(inner).into_frame().unwrap();

    let result = client.handle_frame(&tampered);
    assert!(matches!(
        result,
        Err(HandshakeError::ChallengeDecryptFailed | HandshakeError::ChallengeMismatch)
    ));
    assert_eq!(client.state(), ClientHandshakeState::Disconnected);
}

#[test]
fn corrupted_signed_token_fails_signature_check() {
    let (server_keys, client_keys) = key_pairs();
    let mut server = ServerHandshake::new();
    let mut client = ClientHandshake::new(client_keys, server_keys.public.clone());

    let hello = sent_frame(&client.start().unwrap());
    let issue = sent_frame(&server.handle_frame(&hello, &server_keys, &mut OsRng).unwrap());

    let Payload::TokenIssue(mut inner) = Payload::from_frame(&issue).unwrap() else {
        panic!("expected TokenIssue");
    };
    inner.signed_token[5] ^= 0x80;
    let tampered = Payload::TokenIssue(inner).into_frame().unwrap();

    let result = client.handle_frame(&tampered);
    assert_eq!(result, Err(HandshakeError::SignatureInvalid));
}

#[test]
fn wrong_trusted_server_key_aborts_without_acknowledgment() {
    let (server_keys, client_keys) = key_pairs();
    let wrong_server = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

    let mut server = ServerHandshake::new();
    // Client was configured with the wrong server public key
    let mut client = ClientHandshake::new(client_keys, wrong_server.public);

    let hello = sent_frame(&client.start().unwrap());
    let issue = sent_frame(&server.handle_frame(&hello, &server_keys, &mut OsRng).unwrap());

    let result = client.handle_frame(&issue);
    assert_eq!(result, Err(HandshakeError::SignatureInvalid));
    assert_eq!(client.state(), ClientHandshakeState::Disconnected);
    // Err carries no actions: nothing is sent back to the server
}

#[test]
fn concurrent_handshakes_are_independent() {
    let (server_keys, client_a_keys) = key_pairs();
    let client_b_keys = generate_key_pair(&mut OsRng, TEST_KEY_BITS).unwrap();

    let mut server_a = ServerHandshake::new();
    let mut server_b = ServerHandshake::new();
    let mut client_a = ClientHandshake::new(client_a_keys, server_keys.public.clone());
    let mut client_b = ClientHandshake::new(client_b_keys, server_keys.public.clone());

    let hello_a = sent_frame(&client_a.start().unwrap());
    let hello_b = sent_frame(&client_b.start().unwrap());

    let issue_a = sent_frame(&server_a.handle_frame(&hello_a, &server_keys, &mut OsRng).unwrap());
    let _issue_b = sent_frame(&server_b.handle_frame(&hello_b, &server_keys, &mut OsRng).unwrap());

    // Cross-delivery must fail: A's challenge is bound to A's key only
    let result = client_b.handle_frame(&issue_a);
    assert!(matches!(
        result,
        Err(HandshakeError::ChallengeDecryptFailed | HandshakeError::ChallengeMismatch)
    ));

    // Correct delivery still validates for A despite B's failure
    let verdict_a = sent_frame(&client_a.handle_frame(&issue_a).unwrap());
    server_a.handle_frame(&verdict_a, &server_keys, &mut OsRng).unwrap();
    assert_eq!(server_a.state(), ServerHandshakeState::Validated);
    assert_eq!(client_a.state(), ClientHandshakeState::Validated);

    // B's server connection never validated
    assert_eq!(server_b.state(), ServerHandshakeState::TokenIssued);
}
