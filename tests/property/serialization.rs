//! Property-based codec tests.
//!
//! Uses proptest to verify:
//! 1. Any `ChatMessage` survives encode → decode, including non-ASCII text.
//! 2. Random bytes never cause a panic in `decode` (returns `Err` gracefully).
//! 3. Encoded messages are never larger than the two strings plus their
//!    varint length prefixes.

use fanchat_proto::codec;
use fanchat_proto::message::ChatMessage;
use proptest::prelude::*;

/// Strategy for generating arbitrary `ChatMessage` values.
fn arb_chat_message() -> impl Strategy<Value = ChatMessage> {
    (".{0,64}", ".{0,1024}").prop_map(|(sender, text)| ChatMessage { sender, text })
}

proptest! {
    /// Any ChatMessage survives an encode → decode round-trip.
    #[test]
    fn chat_message_round_trip(msg in arb_chat_message()) {
        let bytes = codec::encode(&msg).expect("encode should succeed");
        let decoded = codec::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Random bytes never cause a panic when decoded; they return Err gracefully.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        // We don't care if it returns Ok or Err, just that it doesn't panic.
        let _ = codec::decode(&bytes);
    }

    /// The encoding carries only the two fields: no framing or metadata.
    #[test]
    fn encoding_is_compact(msg in arb_chat_message()) {
        let bytes = codec::encode(&msg).expect("encode should succeed");
        // Each string has a varint length prefix of at most 2 bytes here.
        prop_assert!(bytes.len() <= msg.sender.len() + msg.text.len() + 4);
    }
}
