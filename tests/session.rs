//! Scenario tests for the sans-IO network session.
//!
//! Each test drives a [`Network`] with wire lines and checks the lines it
//! sends, the events it emits and the roster it keeps.

use std::time::{Duration, Instant};

use slirc_client::isupport::Isupport;
use slirc_client::network::{CHECK_INTERVAL, PONG_TIMEOUT};
use slirc_client::{
    Event, EventKind, Message, Network, NetworkAction, NetworkConfig, Roster, SaslConfig,
    SessionState,
};

fn line(raw: &str) -> Message {
    raw.parse().expect("test line should parse")
}

fn sends(actions: &[NetworkAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(NetworkAction::as_send)
        .map(|m| m.to_string())
        .collect()
}

fn events(actions: &[NetworkAction]) -> Vec<Event> {
    actions.iter().filter_map(NetworkAction::as_event).cloned().collect()
}

fn count(actions: &[NetworkAction], kind: EventKind) -> usize {
    events(actions).iter().filter(|e| e.kind() == kind).count()
}

fn close_of(actions: &[NetworkAction]) -> Option<(String, bool)> {
    actions.iter().find_map(|a| match a {
        NetworkAction::Close {
            reason, reconnect, ..
        } => Some((reason.clone(), *reconnect)),
        _ => None,
    })
}

fn forced(actions: &[NetworkAction]) -> bool {
    actions
        .iter()
        .any(|a| matches!(a, NetworkAction::Close { force: true, .. }))
}

fn config() -> NetworkConfig {
    NetworkConfig::new("irc.example.com", "bot")
}

fn sasl_config() -> NetworkConfig {
    let mut config = config();
    config.sasl = Some(SaslConfig {
        username: "mk".into(),
        password: "hunter2".into(),
    });
    config
}

/// A session that has completed registration.
fn registered(config: NetworkConfig) -> (Network, Instant) {
    let now = Instant::now();
    let mut network = Network::new(config).expect("valid config");
    network.connected(now);
    network.feed(&line(":irc.example.com 001 bot :Welcome"), now);
    (network, now)
}

fn feed(network: &mut Network, raw: &str, now: Instant) -> Vec<NetworkAction> {
    network.feed(&line(raw), now)
}

fn assert_membership_symmetric(roster: &Roster) {
    for user in roster.users() {
        for &cid in user.channels() {
            let channel = roster.channel(cid).expect("user points at a missing channel");
            assert!(
                channel.users().contains(&user.id()),
                "{} lists {} but not the reverse",
                user.nick,
                channel.name
            );
        }
    }
    for channel in roster.channels() {
        for &uid in channel.users() {
            let user = roster.user(uid).expect("channel points at a missing user");
            assert!(
                user.channels().contains(&channel.id()),
                "{} lists {} but not the reverse",
                channel.name,
                user.nick
            );
        }
    }
}

// =============================================================================
// HANDSHAKE
// =============================================================================

#[test]
fn test_registration_lines() {
    let mut config = config();
    config.password = Some("serverpass".into());
    config.realname = Some("Slirc Bot".into());
    let mut network = Network::new(config).unwrap();

    let actions = network.connected(Instant::now());
    assert_eq!(
        sends(&actions),
        ["CAP LS", "PASS serverpass", "NICK bot", "USER bot void void :Slirc Bot"]
    );
    assert_eq!(network.state(), SessionState::CapNegotiating);
    assert!(network.is_waiting_for_cap());
}

#[test]
fn test_cap_negotiation_without_sasl() {
    let mut network = Network::new(config()).unwrap();
    let now = Instant::now();
    network.connected(now);

    let actions = feed(
        &mut network,
        ":irc.example.com CAP * LS :multi-prefix account-tag",
        now,
    );
    assert_eq!(sends(&actions), ["CAP REQ account-tag"]);
    assert_eq!(count(&actions, EventKind::NetworkCapabilities), 1);

    let actions = feed(&mut network, ":irc.example.com CAP * ACK :account-tag", now);
    assert_eq!(sends(&actions), ["CAP END"]);
    assert_eq!(network.state(), SessionState::Registering);
    assert!(network.capabilities().contains("account-tag"));

    let actions = feed(&mut network, ":irc.example.com 001 bot :Welcome", now);
    assert_eq!(count(&actions, EventKind::ConnectionReady), 1);
    assert_eq!(network.state(), SessionState::Registered);
}

#[test]
fn test_cap_ls_with_nothing_wanted_ends_negotiation() {
    let mut network = Network::new(config()).unwrap();
    let now = Instant::now();
    network.connected(now);

    let actions = feed(&mut network, ":irc.example.com CAP * LS :multi-prefix", now);
    assert_eq!(sends(&actions), ["CAP END"]);
    assert!(!network.is_waiting_for_cap());
}

#[test]
fn test_multiline_cap_ls_is_accumulated() {
    let mut network = Network::new(sasl_config()).unwrap();
    let now = Instant::now();
    network.connected(now);

    let actions = feed(&mut network, ":irc.example.com CAP * LS * :sasl multi-prefix", now);
    assert!(actions.is_empty());

    let actions = feed(&mut network, ":irc.example.com CAP * LS :account-tag", now);
    assert_eq!(sends(&actions), ["CAP REQ :sasl account-tag"]);
    let caps = events(&actions)
        .into_iter()
        .find_map(|e| match e {
            Event::NetworkCapabilities { capabilities, .. } => Some(capabilities),
            _ => None,
        })
        .unwrap();
    assert_eq!(caps, ["sasl", "multi-prefix", "account-tag"]);
}

#[test]
fn test_sasl_plain_flow() {
    let mut network = Network::new(sasl_config()).unwrap();
    let now = Instant::now();
    network.connected(now);

    let actions = feed(&mut network, ":irc.example.com CAP * LS :sasl", now);
    assert_eq!(sends(&actions), ["CAP REQ sasl"]);

    let actions = feed(&mut network, ":irc.example.com CAP * ACK :sasl", now);
    assert_eq!(sends(&actions), ["AUTHENTICATE PLAIN"]);
    assert_eq!(network.state(), SessionState::Authenticating);

    let actions = feed(&mut network, "AUTHENTICATE +", now);
    assert_eq!(sends(&actions), ["AUTHENTICATE bWsAbWsAaHVudGVyMg=="]);

    let actions = feed(
        &mut network,
        ":irc.example.com 900 bot bot!mk@host mk :You are now logged in as mk",
        now,
    );
    assert_eq!(sends(&actions), ["CAP END"]);
    assert_eq!(network.state(), SessionState::Registering);
}

#[test]
fn test_sasl_failure_closes_without_retry() {
    let mut network = Network::new(sasl_config()).unwrap();
    let now = Instant::now();
    network.connected(now);
    feed(&mut network, ":irc.example.com CAP * LS :sasl", now);
    feed(&mut network, ":irc.example.com CAP * ACK :sasl", now);

    let actions = feed(
        &mut network,
        ":irc.example.com 904 bot :SASL authentication failed",
        now,
    );
    let (_, reconnect) = close_of(&actions).expect("904 must close the connection");
    assert!(!reconnect);
    assert!(!forced(&actions), "a failed login still flushes the queue");
    assert!(!network.should_reconnect());

    let actions = feed(&mut network, "AUTHENTICATE +", now);
    assert!(sends(&actions).iter().all(|l| !l.starts_with("AUTHENTICATE")));
}

#[test]
fn test_sasl_nak_closes_when_configured() {
    let mut network = Network::new(sasl_config()).unwrap();
    let now = Instant::now();
    network.connected(now);
    feed(&mut network, ":irc.example.com CAP * LS :sasl", now);

    let actions = feed(&mut network, ":irc.example.com CAP * NAK :sasl", now);
    assert_eq!(close_of(&actions).map(|(_, r)| r), Some(false));
    assert!(!network.should_reconnect());
}

#[test]
fn test_welcome_without_cap_support() {
    let mut config = config();
    config.channels.push("#rust".into());
    let mut network = Network::new(config).unwrap();
    let now = Instant::now();
    network.connected(now);

    let actions = feed(&mut network, ":irc.example.com 001 bot :Welcome", now);
    let lines = sends(&actions);
    assert!(!lines.contains(&"CAP END".to_string()));
    assert_eq!(lines, ["JOIN #rust"]);
    assert_eq!(network.state(), SessionState::Registered);
    assert!(!network.is_waiting_for_cap());

    // End of MOTD does not fire a second ready.
    let actions = feed(&mut network, ":irc.example.com 376 bot :End of MOTD", now);
    assert!(actions.is_empty());
}

#[test]
fn test_welcome_records_server_nick() {
    let mut network = Network::new(config()).unwrap();
    let now = Instant::now();
    network.connected(now);
    feed(&mut network, ":irc.example.com 001 Bot :Welcome", now);
    assert_eq!(network.nickname(), "Bot");
}

#[test]
fn test_nickname_in_use_appends_underscore() {
    let mut network = Network::new(config()).unwrap();
    let now = Instant::now();
    network.connected(now);

    let actions = feed(&mut network, ":irc.example.com 433 * bot :Nickname is already in use", now);
    assert_eq!(sends(&actions), ["NICK bot_"]);
    let actions = feed(&mut network, ":irc.example.com 433 * bot_ :Nickname is already in use", now);
    assert_eq!(sends(&actions), ["NICK bot__"]);

    feed(&mut network, ":irc.example.com 001 bot__ :Welcome", now);
    let actions = feed(&mut network, ":irc.example.com 433 bot__ other :Nickname is already in use", now);
    assert!(actions.is_empty());
}

#[test]
fn test_missing_nickname_fails_at_construction() {
    let config = NetworkConfig::new("irc.example.com", "");
    assert!(Network::new(config).is_err());
}

// =============================================================================
// KEEPALIVE
// =============================================================================

#[test]
fn test_ping_is_answered_and_refreshes_last_pong() {
    let (mut network, t0) = registered(config());
    let later = t0 + Duration::from_secs(42);

    let actions = feed(&mut network, "PING :12345", later);
    assert_eq!(sends(&actions), ["PONG 12345"]);
    assert_eq!(count(&actions, EventKind::NetworkPing), 1);
    assert_eq!(network.last_pong(), Some(later));
}

#[test]
fn test_quiet_link_pings_then_times_out() {
    let (mut network, t0) = registered(config());

    let actions = network.poll_keepalive(t0 + CHECK_INTERVAL);
    assert!(actions.is_empty());

    let ping_at = t0 + Duration::from_secs(150);
    let actions = network.poll_keepalive(ping_at);
    let lines = sends(&actions);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("PING "));
    assert_eq!(network.next_wakeup(), Some(ping_at + PONG_TIMEOUT));

    let actions = network.poll_keepalive(ping_at + PONG_TIMEOUT);
    let (reason, reconnect) = close_of(&actions).expect("unanswered ping must close");
    assert_eq!(reason, "ping timeout");
    assert!(reconnect);
    assert!(forced(&actions), "a silent server is dropped without a flush");
}

#[test]
fn test_pong_cancels_timeout() {
    let (mut network, t0) = registered(config());
    let ping_at = t0 + Duration::from_secs(150);
    network.poll_keepalive(ping_at);

    let actions = feed(&mut network, ":irc.example.com PONG irc.example.com :1700000000", ping_at + Duration::from_secs(2));
    assert_eq!(count(&actions, EventKind::NetworkPong), 1);

    let actions = network.poll_keepalive(ping_at + PONG_TIMEOUT);
    assert!(close_of(&actions).is_none());
}

// =============================================================================
// ISUPPORT
// =============================================================================

#[test]
fn test_isupport_defaults() {
    let isupport = Isupport::new();
    assert_eq!(isupport.prefix().prefix_for_mode('o'), Some('@'));
    assert_eq!(isupport.prefix().prefix_for_mode('v'), Some('+'));
    assert_eq!(isupport.nicklen(), 9);
    assert_eq!(isupport.modes(), 3);
}

#[test]
fn test_isupport_feeds_names_prefixes() {
    let (mut network, now) = registered(config());
    feed(
        &mut network,
        ":irc.example.com 005 bot PREFIX=(qaohv)~&@%+ NICKLEN=30 :are supported by this server",
        now,
    );
    assert_eq!(network.isupport().nicklen(), 30);

    feed(&mut network, ":irc.example.com 353 bot = #x :~alice %bob carol", now);
    let roster = network.roster();
    let alice = roster.user(roster.find_user("alice").unwrap()).unwrap();
    assert!(alice.is_owner());
    let bob = roster.user(roster.find_user("bob").unwrap()).unwrap();
    assert!(bob.is_half_operator());
    let carol = roster.user(roster.find_user("carol").unwrap()).unwrap();
    assert!(carol.modes.is_empty());
    assert_membership_symmetric(roster);
}

// =============================================================================
// ENTITY TRACKING
// =============================================================================

#[test]
fn test_channel_created_once() {
    let (mut network, now) = registered(config());
    let mut all = Vec::new();
    all.extend(feed(&mut network, ":alice!a@host JOIN #x", now));
    all.extend(feed(&mut network, ":bob!b@host JOIN #x", now));
    all.extend(feed(&mut network, ":irc.example.com 353 bot = #x :alice @bob", now));
    all.extend(feed(&mut network, ":irc.example.com 353 bot = #x :alice @bob", now));

    assert_eq!(count(&all, EventKind::ChannelCreated), 1);
    assert_eq!(count(&all, EventKind::UserCreated), 2);
    assert_eq!(count(&all, EventKind::ChannelWhoReply), 2);
    assert_eq!(network.roster().channel_count(), 1);
    assert_eq!(network.roster().user_count(), 2);
}

#[test]
fn test_configured_channels_are_known_without_events() {
    let mut config = config();
    config.channels.push("#rust".into());
    let (mut network, now) = registered(config);
    assert!(network.roster().find_channel("#rust").is_some());

    let actions = feed(&mut network, ":bot!bot@host JOIN #rust", now);
    assert_eq!(count(&actions, EventKind::ChannelCreated), 0);
    assert_eq!(count(&actions, EventKind::UserEntered), 1);
}

#[test]
fn test_membership_stays_symmetric() {
    let (mut network, now) = registered(config());
    let script = [
        ":bot!bot@host JOIN #a",
        ":bot!bot@host JOIN #b",
        ":alice!a@host JOIN #a",
        ":alice!a@host JOIN #b",
        ":bob!b@host JOIN #a",
        ":carol!c@host JOIN #b",
        ":alice!a@host PART #a :later",
        ":op!o@host KICK #b carol :bye",
        ":bob!b@host QUIT :gone",
        ":dave!d@host JOIN #a",
        ":dave!d@host NICK eve",
        ":bot!bot@host PART #b",
    ];
    for raw in script {
        feed(&mut network, raw, now);
        assert_membership_symmetric(network.roster());
    }

    let roster = network.roster();
    assert!(roster.find_channel("#b").is_none());
    assert!(roster.find_user("bob").is_none());
    assert!(roster.find_user("carol").is_none());
    assert!(roster.find_user("dave").is_none());
    assert!(roster.find_user("eve").is_some());
    // alice was only left in #b, which we parted.
    assert!(roster.find_user("alice").is_none());
}

#[test]
fn test_parting_last_channel_removes_user() {
    let (mut network, now) = registered(config());
    feed(&mut network, ":bot!bot@host JOIN #a", now);
    feed(&mut network, ":bot!bot@host JOIN #b", now);
    feed(&mut network, ":alice!a@host JOIN #a", now);
    feed(&mut network, ":alice!a@host JOIN #b", now);

    let actions = feed(&mut network, ":alice!a@host PART #a :bye", now);
    assert!(network.roster().find_user("alice").is_some());
    let left = events(&actions);
    assert!(matches!(
        &left[..],
        [Event::UserLeft { reason: Some(r), .. }] if r == "bye"
    ));

    feed(&mut network, ":alice!a@host PART #b", now);
    assert!(network.roster().find_user("alice").is_none());
}

#[test]
fn test_quit_and_kick_carry_reasons() {
    let (mut network, now) = registered(config());
    feed(&mut network, ":alice!a@host JOIN #a", now);
    feed(&mut network, ":bob!b@host JOIN #a", now);

    let actions = feed(&mut network, ":op!o@host KICK #a bob :flooding", now);
    match &events(&actions)[..] {
        [Event::UserKicked { kicker, kickee, reason, channel, .. }] => {
            assert_eq!(kicker, "op");
            assert_eq!(kickee.nick, "bob");
            assert_eq!(reason.as_deref(), Some("flooding"));
            assert_eq!(channel.users, ["alice"]);
        }
        other => panic!("unexpected events: {:?}", other),
    }

    let actions = feed(&mut network, ":alice!a@host QUIT :Ping timeout", now);
    match &events(&actions)[..] {
        [Event::UserQuit { user, reason, .. }] => {
            assert_eq!(user.nick, "alice");
            assert_eq!(reason.as_deref(), Some("Ping timeout"));
        }
        other => panic!("unexpected events: {:?}", other),
    }
    assert_eq!(network.roster().user_count(), 0);
}

#[test]
fn test_nick_changes() {
    let (mut network, now) = registered(config());
    feed(&mut network, ":bot!bot@host JOIN #a", now);
    feed(&mut network, ":alice!a@host JOIN #a", now);

    let actions = feed(&mut network, ":alice!a@host NICK Alicia", now);
    match &events(&actions)[..] {
        [Event::UserRename { user, new_nick, .. }] => {
            assert_eq!(user.nick, "alice");
            assert_eq!(new_nick, "Alicia");
        }
        other => panic!("unexpected events: {:?}", other),
    }
    let roster = network.roster();
    assert!(roster.find_user("alice").is_none());
    assert!(roster.find_user("alicia").is_some());

    let actions = feed(&mut network, ":bot!bot@host NICK robot", now);
    assert_eq!(count(&actions, EventKind::NickChanged), 1);
    assert_eq!(network.nickname(), "robot");
}

#[test]
fn test_topic_reply_and_command() {
    let (mut network, now) = registered(config());
    let actions = feed(&mut network, ":irc.example.com 332 bot #a :Rust talk", now);
    assert_eq!(count(&actions, EventKind::ChannelCreated), 1);
    match events(&actions).last() {
        Some(Event::ChannelTopic { channel, topic, setter, .. }) => {
            assert_eq!(channel.topic.as_deref(), Some("Rust talk"));
            assert_eq!(topic, "Rust talk");
            assert!(setter.is_none());
        }
        other => panic!("unexpected event: {:?}", other),
    }

    feed(&mut network, ":alice!a@host JOIN #a", now);
    let actions = feed(&mut network, ":alice!a@host TOPIC #a :New topic", now);
    match &events(&actions)[..] {
        [Event::ChannelTopic { setter: Some(setter), topic, .. }] => {
            assert_eq!(setter.nick, "alice");
            assert_eq!(topic, "New topic");
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_channel_and_user_modes() {
    let (mut network, now) = registered(config());
    feed(
        &mut network,
        ":irc.example.com 005 bot CHANMODES=beI,k,l,imnpst :are supported by this server",
        now,
    );
    feed(&mut network, ":bot!bot@host JOIN #a", now);
    feed(&mut network, ":bob!b@host JOIN #a", now);

    let actions = feed(&mut network, ":op!o@host MODE #a +ok bob secret", now);
    let evs = events(&actions);
    assert!(evs.iter().any(|e| matches!(
        e,
        Event::UserMode { user, .. } if user.nick == "bob" && user.modes.contains('o')
    )));
    assert!(evs.iter().any(|e| matches!(
        e,
        Event::ChannelMode { channel, modes, .. } if channel.modes == "k" && modes.len() == 1
    )));

    // List modes are reported but not stored.
    let actions = feed(&mut network, ":op!o@host MODE #a +b *!*@spam", now);
    assert_eq!(count(&actions, EventKind::ChannelMode), 1);
    let roster = network.roster();
    let channel = roster.channel(roster.find_channel("#a").unwrap()).unwrap();
    assert_eq!(channel.modes, "k");

    let actions = feed(&mut network, ":bot MODE bot :+iw", now);
    assert_eq!(count(&actions, EventKind::UserMode), 1);
    assert_eq!(network.modes(), "iw");
}

// =============================================================================
// MESSAGES
// =============================================================================

#[test]
fn test_channel_message_end_to_end() {
    let (mut network, now) = registered(config());
    feed(&mut network, ":mk!mk@uplink.io JOIN #channel", now);

    let actions = feed(&mut network, ":mk!mk@uplink.io PRIVMSG #channel :hello", now);
    assert_eq!(actions.len(), 1);
    match &events(&actions)[..] {
        [Event::Message { user, channel, text, tags, .. }] => {
            assert_eq!(user.nick, "mk");
            assert_eq!(channel.name, "#channel");
            assert_eq!(text, "hello");
            assert!(tags.is_empty());
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_private_message_from_unknown_user() {
    let (mut network, now) = registered(config());
    let actions = feed(
        &mut network,
        "@account=mk :mk!mk@uplink.io PRIVMSG bot :psst",
        now,
    );
    match &events(&actions)[..] {
        [Event::PrivateMessage { user, text, tags, .. }] => {
            assert_eq!(user.nick, "mk");
            assert_eq!(user.hostname, "uplink.io");
            assert_eq!(text, "psst");
            assert_eq!(tags.get("account"), Some("mk"));
        }
        other => panic!("unexpected events: {:?}", other),
    }
    assert_eq!(network.roster().user_count(), 0);
}

#[test]
fn test_server_privmsg_is_ignored() {
    let (mut network, now) = registered(config());
    let actions = feed(&mut network, ":irc.example.com PRIVMSG bot :hello", now);
    assert!(actions.is_empty());
}

#[test]
fn test_bad_lines_do_not_stop_dispatch() {
    let (mut network, now) = registered(config());
    // No source: the handler fails and is logged.
    assert!(feed(&mut network, "JOIN #a", now).is_empty());
    // Unknown commands fall through.
    assert!(feed(&mut network, ":irc.example.com 999 bot :whatever", now).is_empty());
    assert!(feed(&mut network, ":irc.example.com WALLOPS :hi", now).is_empty());

    let actions = feed(&mut network, "PING :still-here", now);
    assert_eq!(sends(&actions), ["PONG still-here"]);
}

// =============================================================================
// DISCONNECT
// =============================================================================

#[test]
fn test_disconnect_resets_once() {
    let mut config = config();
    config.channels.push("#rust".into());
    let (mut network, now) = registered(config);
    feed(&mut network, ":alice!a@host JOIN #rust", now);
    feed(&mut network, ":alice!a@host JOIN #other", now);

    let actions = network.disconnected();
    assert_eq!(count(&actions, EventKind::ConnectionClose), 1);
    assert_eq!(network.state(), SessionState::Idle);
    assert!(!network.is_ready());
    assert_eq!(network.roster().user_count(), 0);
    assert_eq!(network.roster().channel_count(), 1);
    assert_eq!(network.next_wakeup(), None);

    assert!(network.disconnected().is_empty());
    assert!(network.should_reconnect());
}

#[test]
fn test_local_quit_disables_reconnect() {
    let (mut network, _) = registered(config());
    network.quit(Some("bye"));
    assert_eq!(sends(&network.take_actions()), ["QUIT bye"]);
    assert!(!network.should_reconnect());
}
