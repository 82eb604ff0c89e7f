//! Events emitted by network sessions for scripts and other consumers.
//!
//! Events carry owned snapshots ([`UserInfo`], [`ChannelInfo`]) rather
//! than references into a session, so they can cross task boundaries and
//! outlive the records they describe.

use std::fmt;

use crate::entity::{Channel, User};
use crate::message::Tags;
use crate::mode::ModeChange;

/// Snapshot of a [`User`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Nickname.
    pub nick: String,
    /// Username, possibly empty.
    pub username: String,
    /// Hostname, possibly empty.
    pub hostname: String,
    /// Accumulated modes.
    pub modes: String,
}

impl UserInfo {
    /// A snapshot of a user not tracked in any roster.
    pub fn transient(nick: &str, username: &str, hostname: &str) -> Self {
        UserInfo {
            nick: nick.to_owned(),
            username: username.to_owned(),
            hostname: hostname.to_owned(),
            modes: String::new(),
        }
    }
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            nick: user.nick.clone(),
            username: user.username.clone(),
            hostname: user.hostname.clone(),
            modes: user.modes.clone(),
        }
    }
}

/// Snapshot of a [`Channel`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name.
    pub name: String,
    /// Topic, if known.
    pub topic: Option<String>,
    /// Accumulated modes.
    pub modes: String,
    /// Nicknames present.
    pub users: Vec<String>,
}

impl ChannelInfo {
    /// Snapshot a channel, resolving member nicks with `nick_of`.
    pub fn snapshot<'a, F>(channel: &Channel, nick_of: F) -> Self
    where
        F: Fn(&crate::entity::UserId) -> Option<&'a str>,
    {
        ChannelInfo {
            name: channel.name.clone(),
            topic: channel.topic.clone(),
            modes: channel.modes.clone(),
            users: channel
                .users()
                .iter()
                .filter_map(|id| nick_of(id).map(str::to_owned))
                .collect(),
        }
    }
}

/// Everything a session reports to the outside world.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// Registration finished; configured channels are being joined.
    ConnectionReady {
        /// Network id.
        network: String,
    },
    /// The connection went away.
    ConnectionClose {
        /// Network id.
        network: String,
    },
    /// A PRIVMSG to a known channel.
    Message {
        /// Network id.
        network: String,
        /// Sender.
        user: UserInfo,
        /// Target channel.
        channel: ChannelInfo,
        /// Message body.
        text: String,
        /// IRCv3 tags, empty if none.
        tags: Tags,
    },
    /// A PRIVMSG to anything that is not a known channel.
    PrivateMessage {
        /// Network id.
        network: String,
        /// Sender.
        user: UserInfo,
        /// Message body.
        text: String,
        /// IRCv3 tags, empty if none.
        tags: Tags,
    },
    /// Someone joined a channel.
    UserEntered {
        /// Network id.
        network: String,
        /// Channel joined.
        channel: ChannelInfo,
        /// Who joined.
        user: UserInfo,
    },
    /// Someone parted a channel.
    UserLeft {
        /// Network id.
        network: String,
        /// Channel parted.
        channel: ChannelInfo,
        /// Who parted.
        user: UserInfo,
        /// Part message, if any.
        reason: Option<String>,
    },
    /// Someone disconnected from the network.
    UserQuit {
        /// Network id.
        network: String,
        /// Who quit.
        user: UserInfo,
        /// Quit message, if any.
        reason: Option<String>,
    },
    /// Someone was kicked from a channel.
    UserKicked {
        /// Network id.
        network: String,
        /// Nick or server that issued the kick.
        kicker: String,
        /// Channel kicked from.
        channel: ChannelInfo,
        /// Who was kicked.
        kickee: UserInfo,
        /// Kick reason, if any.
        reason: Option<String>,
    },
    /// Someone changed nickname.
    UserRename {
        /// Network id.
        network: String,
        /// The user as it was before the rename.
        user: UserInfo,
        /// The new nickname.
        new_nick: String,
    },
    /// Our own nickname changed.
    NickChanged {
        /// Network id.
        network: String,
        /// The new nickname.
        nick: String,
    },
    /// A topic was received or changed.
    ChannelTopic {
        /// Network id.
        network: String,
        /// Channel, with the new topic applied.
        channel: ChannelInfo,
        /// The topic text.
        topic: String,
        /// Who set it, when the change came from a TOPIC command.
        setter: Option<UserInfo>,
    },
    /// Channel modes changed.
    ChannelMode {
        /// Network id.
        network: String,
        /// Channel after the change.
        channel: ChannelInfo,
        /// The changes applied.
        modes: Vec<ModeChange>,
    },
    /// A user's modes changed, either directly or through a channel status
    /// mode.
    UserMode {
        /// Network id.
        network: String,
        /// User after the change.
        user: UserInfo,
        /// The changes applied.
        modes: Vec<ModeChange>,
    },
    /// A channel was seen for the first time.
    ChannelCreated {
        /// Network id.
        network: String,
        /// The new channel.
        channel: ChannelInfo,
    },
    /// A user was seen for the first time.
    UserCreated {
        /// Network id.
        network: String,
        /// The new user.
        user: UserInfo,
    },
    /// A NAMES reply was applied.
    ChannelWhoReply {
        /// Network id.
        network: String,
        /// Channel with the updated member list.
        channel: ChannelInfo,
    },
    /// The server pinged us.
    NetworkPing {
        /// Network id.
        network: String,
        /// Ping token.
        token: String,
    },
    /// The server answered our ping.
    NetworkPong {
        /// Network id.
        network: String,
        /// Pong token.
        token: Option<String>,
    },
    /// The server's full capability list.
    NetworkCapabilities {
        /// Network id.
        network: String,
        /// Every capability advertised in `CAP LS`.
        capabilities: Vec<String>,
    },
    /// Published by the script layer once its scripts are loaded.
    ScriptsLoaded,
    /// Published after configuration was (re)loaded.
    ConfigLoad,
}

/// Discriminant of [`Event`], used to subscribe callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    /// [`Event::ConnectionReady`]
    ConnectionReady,
    /// [`Event::ConnectionClose`]
    ConnectionClose,
    /// [`Event::Message`]
    Message,
    /// [`Event::PrivateMessage`]
    PrivateMessage,
    /// [`Event::UserEntered`]
    UserEntered,
    /// [`Event::UserLeft`]
    UserLeft,
    /// [`Event::UserQuit`]
    UserQuit,
    /// [`Event::UserKicked`]
    UserKicked,
    /// [`Event::UserRename`]
    UserRename,
    /// [`Event::NickChanged`]
    NickChanged,
    /// [`Event::ChannelTopic`]
    ChannelTopic,
    /// [`Event::ChannelMode`]
    ChannelMode,
    /// [`Event::UserMode`]
    UserMode,
    /// [`Event::ChannelCreated`]
    ChannelCreated,
    /// [`Event::UserCreated`]
    UserCreated,
    /// [`Event::ChannelWhoReply`]
    ChannelWhoReply,
    /// [`Event::NetworkPing`]
    NetworkPing,
    /// [`Event::NetworkPong`]
    NetworkPong,
    /// [`Event::NetworkCapabilities`]
    NetworkCapabilities,
    /// [`Event::ScriptsLoaded`]
    ScriptsLoaded,
    /// [`Event::ConfigLoad`]
    ConfigLoad,
}

impl EventKind {
    /// The snake_case name scripts subscribe with.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ConnectionReady => "connection_ready",
            EventKind::ConnectionClose => "connection_close",
            EventKind::Message => "message",
            EventKind::PrivateMessage => "private_message",
            EventKind::UserEntered => "user_entered",
            EventKind::UserLeft => "user_left",
            EventKind::UserQuit => "user_quit",
            EventKind::UserKicked => "user_kicked",
            EventKind::UserRename => "user_rename",
            EventKind::NickChanged => "nick_changed",
            EventKind::ChannelTopic => "channel_topic",
            EventKind::ChannelMode => "channel_mode",
            EventKind::UserMode => "user_mode",
            EventKind::ChannelCreated => "channel_created",
            EventKind::UserCreated => "user_created",
            EventKind::ChannelWhoReply => "channel_who_reply",
            EventKind::NetworkPing => "network_ping",
            EventKind::NetworkPong => "network_pong",
            EventKind::NetworkCapabilities => "network_capabilities",
            EventKind::ScriptsLoaded => "scripts_loaded",
            EventKind::ConfigLoad => "config_load",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    /// This event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ConnectionReady { .. } => EventKind::ConnectionReady,
            Event::ConnectionClose { .. } => EventKind::ConnectionClose,
            Event::Message { .. } => EventKind::Message,
            Event::PrivateMessage { .. } => EventKind::PrivateMessage,
            Event::UserEntered { .. } => EventKind::UserEntered,
            Event::UserLeft { .. } => EventKind::UserLeft,
            Event::UserQuit { .. } => EventKind::UserQuit,
            Event::UserKicked { .. } => EventKind::UserKicked,
            Event::UserRename { .. } => EventKind::UserRename,
            Event::NickChanged { .. } => EventKind::NickChanged,
            Event::ChannelTopic { .. } => EventKind::ChannelTopic,
            Event::ChannelMode { .. } => EventKind::ChannelMode,
            Event::UserMode { .. } => EventKind::UserMode,
            Event::ChannelCreated { .. } => EventKind::ChannelCreated,
            Event::UserCreated { .. } => EventKind::UserCreated,
            Event::ChannelWhoReply { .. } => EventKind::ChannelWhoReply,
            Event::NetworkPing { .. } => EventKind::NetworkPing,
            Event::NetworkPong { .. } => EventKind::NetworkPong,
            Event::NetworkCapabilities { .. } => EventKind::NetworkCapabilities,
            Event::ScriptsLoaded => EventKind::ScriptsLoaded,
            Event::ConfigLoad => EventKind::ConfigLoad,
        }
    }

    /// The originating network, for session events.
    pub fn network(&self) -> Option<&str> {
        match self {
            Event::ConnectionReady { network }
            | Event::ConnectionClose { network }
            | Event::Message { network, .. }
            | Event::PrivateMessage { network, .. }
            | Event::UserEntered { network, .. }
            | Event::UserLeft { network, .. }
            | Event::UserQuit { network, .. }
            | Event::UserKicked { network, .. }
            | Event::UserRename { network, .. }
            | Event::NickChanged { network, .. }
            | Event::ChannelTopic { network, .. }
            | Event::ChannelMode { network, .. }
            | Event::UserMode { network, .. }
            | Event::ChannelCreated { network, .. }
            | Event::UserCreated { network, .. }
            | Event::ChannelWhoReply { network, .. }
            | Event::NetworkPing { network, .. }
            | Event::NetworkPong { network, .. }
            | Event::NetworkCapabilities { network, .. } => Some(network),
            Event::ScriptsLoaded | Event::ConfigLoad => None,
        }
    }
}
