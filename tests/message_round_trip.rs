//! Integration tests for message parsing and serialization.
//!
//! Lines decoded from the wire must re-encode byte for byte.

use slirc_client::{encode, Message, MessageParseError, Prefix};

fn assert_round_trip(line: &str) {
    let message: Message = line.parse().expect("Failed to parse message");
    assert_eq!(message.to_string(), line);
}

#[test]
fn test_round_trip_simple() {
    assert_round_trip("PING :irc.example.com");
    assert_round_trip("PING irc.example.com");
    assert_round_trip("QUIT");
}

#[test]
fn test_round_trip_with_prefix() {
    assert_round_trip(":nick!user@host PRIVMSG #channel :Hello, world!");
    assert_round_trip(":irc.example.com NOTICE * :*** Looking up your hostname...");
}

#[test]
fn test_round_trip_with_tags() {
    assert_round_trip(
        "@time=2023-01-01T00:00:00.000Z;msgid=abc123 :nick!user@host PRIVMSG #channel :Tagged message",
    );
    assert_round_trip("@account=mk;+draft/flag :mk!mk@uplink.io PRIVMSG #c hi");
    assert_round_trip("@label=a\\sb\\:c :s 001 mk :hi");
}

#[test]
fn test_round_trip_numerics() {
    assert_round_trip(":server 001 nickname :Welcome to the IRC Network");
    assert_round_trip(
        ":irc.example.com 005 mk CHANTYPES=# PREFIX=(ov)@+ NICKLEN=30 :are supported by this server",
    );
    assert_round_trip(":irc.example.com 353 mk = #rust :@alice +bob carol");
    assert_round_trip(":irc.example.com CAP * LS * :sasl account-tag");
}

#[test]
fn test_empty_and_colon_trailing() {
    assert_round_trip(":mk!mk@uplink.io TOPIC #c :");
    assert_round_trip(":mk!mk@uplink.io PRIVMSG #c ::)");
    assert_round_trip(":mk!mk@uplink.io PRIVMSG #c :  leading spaces");
}

#[test]
fn test_end_to_end_privmsg_fields() {
    let msg: Message = ":mk!mk@uplink.io PRIVMSG #channel :hello".parse().unwrap();
    assert_eq!(msg.prefix, Some(Prefix::new("mk", "mk", "uplink.io")));
    assert_eq!(msg.command, "PRIVMSG");
    assert_eq!(msg.params, ["#channel", "hello"]);
    assert!(msg.tags.is_empty());
    assert_eq!(msg.source_nickname(), Some("mk"));
}

#[test]
fn test_command_case_preserved() {
    let msg: Message = "privmsg #c :hi".parse().unwrap();
    assert_eq!(msg.command, "privmsg");
    assert!(msg.is("PRIVMSG"));
}

#[test]
fn test_missing_command_is_malformed() {
    assert_eq!(
        ":only.a.prefix".parse::<Message>(),
        Err(MessageParseError::MissingCommand)
    );
    assert_eq!("".parse::<Message>(), Err(MessageParseError::EmptyMessage));
}

#[test]
fn test_encode_helper() {
    assert_eq!(encode("PRIVMSG", &["#c", "hello world"]), "PRIVMSG #c :hello world");
    assert_eq!(encode("JOIN", &["#c"]), "JOIN #c");
    assert_eq!(encode("USER", &["mk", "void", "void", "mk"]), "USER mk void void mk");

    let many: Vec<String> = (1..=17).map(|i| format!("p{}", i)).collect();
    let many: Vec<&str> = many.iter().map(String::as_str).collect();
    let line = encode("005", &many);
    let reparsed: Message = line.parse().unwrap();
    assert_eq!(reparsed.params.len(), 15);
    assert_eq!(reparsed.params[14], "p15 p16 p17");
}
