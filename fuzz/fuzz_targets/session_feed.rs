//! Fuzz target for the network session
//!
//! Each input line is decoded and fed to one session. Handlers may reject
//! lines but must never panic or break roster membership.

#![no_main]

use std::time::{Duration, Instant};

use libfuzzer_sys::fuzz_target;
use slirc_client::{Message, Network, NetworkConfig};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let Ok(mut network) = Network::new(NetworkConfig::new("irc.example.com", "fuzz")) else {
        return;
    };
    let start = Instant::now();
    network.connected(start);

    for (i, line) in input.lines().take(256).enumerate() {
        let now = start + Duration::from_secs(i as u64);
        if let Ok(msg) = Message::decode(line) {
            network.feed(&msg, now);
        }
        network.poll_keepalive(now);
    }

    let roster = network.roster();
    for user in roster.users() {
        for &cid in user.channels() {
            let channel = roster.channel(cid).expect("dangling channel id");
            assert!(channel.users().contains(&user.id()));
        }
    }
    for channel in roster.channels() {
        for &uid in channel.users() {
            let user = roster.user(uid).expect("dangling user id");
            assert!(user.channels().contains(&channel.id()));
        }
    }

    network.disconnected();
});
