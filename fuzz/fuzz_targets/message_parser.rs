//! Fuzz target for IRC message parsing
//!
//! Feeds arbitrary input to the parser and the outbound sanitizer, and
//! checks that anything that parses also re-parses after serialization.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::{IrcCodec, Message};
use std::str;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = str::from_utf8(data) else {
        return;
    };
    if input.is_empty() || input.len() > 8191 + 512 {
        return;
    }

    if let Ok(msg) = Message::decode(input) {
        let wire = msg.to_string();
        assert!(
            Message::decode(&wire).is_ok(),
            "serialized form of {:?} failed to parse: {:?}",
            input,
            wire
        );
    }

    let _ = IrcCodec::sanitize(input.to_string());
});
