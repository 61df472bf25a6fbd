//! Sanitation tests for linktest-core
//! These run on the host with std, but exercise the no_std code paths

use linktest_core::message::{is_clean_byte, COUNTER_LEN};
use linktest_core::{sanitize, sanitized_key, Message};

#[test]
fn quote_and_backslash_become_question_marks() {
    let key = sanitized_key(&[0x22, 0x5C, 0x41]);
    assert_eq!(key.as_str(), "??A");
}

#[test]
fn sanitize_is_idempotent_for_every_byte() {
    let mut once: Vec<u8> = (0u8..=255).collect();
    sanitize(&mut once);
    let mut twice = once.clone();
    assert_eq!(sanitize(&mut twice), 0);
    assert_eq!(once, twice);
}

#[test]
fn sanitized_output_is_always_clean() {
    let bytes: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
    let key = sanitized_key(&bytes);
    assert_eq!(key.len(), linktest_core::MAX_KEY_LEN);
    assert!(key.bytes().all(is_clean_byte));
}

#[test]
fn printable_range_boundaries() {
    assert!(!is_clean_byte(b' '));
    assert!(is_clean_byte(b'!'));
    assert!(is_clean_byte(b'~'));
    assert!(!is_clean_byte(0x7F));
    assert!(!is_clean_byte(b'\n'));
}

#[test]
fn received_counter_is_not_sanitized() {
    // Counter 0x225C would be `"\` if treated as text.
    let payload = [0x5C, 0x22, b'k', b'e', b'y', b'\0'];
    let message = Message::from_received(&payload);
    assert_eq!(message.counter, 0x225C);
    assert_eq!(message.key.as_str(), "key?");
}

#[test]
fn encode_places_counter_before_key() {
    let plan = linktest_core::TestPlan::builder()
        .roster([1, 2])
        .key("deadbeef")
        .p2p(linktest_core::RadioConfig::lora())
        .build()
        .unwrap();
    let message = plan.message(3);
    let mut buf = [0u8; 32];
    let len = message.encode(&mut buf).unwrap();

    assert_eq!(len, plan.payload_len());
    assert_eq!(&buf[..COUNTER_LEN], &[3, 0]);
    assert_eq!(&buf[COUNTER_LEN..len], b"deadbeef");
    assert_eq!(Message::from_received(&buf[..len]), message);
}
