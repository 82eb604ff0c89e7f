//! IRCv3 capability negotiation support.
//!
//! Capability names the client knows how to use, and parsing of the
//! server's `CAP` replies.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use crate::message::Message;

/// Known IRCv3 capability types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// SASL authentication
    Sasl,
    /// Add account tag to messages
    AccountTag,
    /// Notify of account login/logout
    AccountNotify,
    /// Show all user prefix modes in NAMES
    MultiPrefix,
    /// Full nick!user@host in NAMES
    UserhostInNames,
    /// Server-time message tags
    ServerTime,
    /// Client message tags support
    MessageTags,
    /// Unknown/custom capability
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::Sasl => "sasl",
            Self::AccountTag => "account-tag",
            Self::AccountNotify => "account-notify",
            Self::MultiPrefix => "multi-prefix",
            Self::UserhostInNames => "userhost-in-names",
            Self::ServerTime => "server-time",
            Self::MessageTags => "message-tags",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "sasl" => Self::Sasl,
            "account-tag" => Self::AccountTag,
            "account-notify" => Self::AccountNotify,
            "multi-prefix" => Self::MultiPrefix,
            "userhost-in-names" => Self::UserhostInNames,
            "server-time" => Self::ServerTime,
            "message-tags" => Self::MessageTags,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Capabilities requested on every connection, besides `sasl` which is
/// only requested when credentials are configured.
pub const DEFAULT_CAPABILITIES: &[Capability] = &[Capability::AccountTag, Capability::AccountNotify];

/// `CAP` subcommands a server may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapSubCommand {
    /// Capability listing.
    Ls,
    /// Currently enabled capabilities.
    List,
    /// Request accepted.
    Ack,
    /// Request rejected.
    Nak,
    /// Capability became available (cap-notify).
    New,
    /// Capability was withdrawn (cap-notify).
    Del,
}

impl CapSubCommand {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LS" => Some(Self::Ls),
            "LIST" => Some(Self::List),
            "ACK" => Some(Self::Ack),
            "NAK" => Some(Self::Nak),
            "NEW" => Some(Self::New),
            "DEL" => Some(Self::Del),
            _ => None,
        }
    }
}

/// A decoded `CAP <target> <subcommand> [*] :<caps>` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapReply {
    /// Which reply this is.
    pub subcommand: CapSubCommand,
    /// More lines of the same reply follow (`*` continuation marker).
    pub more: bool,
    /// Capability names with any `=value` suffix stripped. A leading `-`
    /// (disable marker in ACK) is kept.
    pub caps: Vec<String>,
}

impl CapReply {
    /// Parse a `CAP` message. Returns `None` for anything that is not a
    /// well-formed server reply.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if !msg.is("CAP") || msg.params.len() < 3 {
            return None;
        }
        let subcommand = CapSubCommand::parse(&msg.params[1])?;
        let (more, list) = if msg.params.len() >= 4 && msg.params[2] == "*" {
            (true, msg.params[3].as_str())
        } else {
            (false, msg.params[2].as_str())
        };
        let caps = list
            .split_whitespace()
            .map(|c| c.split_once('=').map_or(c, |(name, _)| name).to_owned())
            .collect();
        Some(CapReply {
            subcommand,
            more,
            caps,
        })
    }

    /// Whether `cap` is listed in this reply.
    pub fn contains(&self, cap: &Capability) -> bool {
        self.caps.iter().any(|c| c == cap.as_ref())
    }
}
