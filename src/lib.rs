//! # slirc-client
//!
//! A stateful IRC client engine: one protocol session per network, with
//! capability negotiation, SASL PLAIN, keepalive and channel/user
//! tracking, driven over TCP or TLS by tokio.
//!
//! ## Features
//!
//! - IRC message parsing and serialization with IRCv3 tags
//! - CAP LS/REQ/ACK negotiation and SASL PLAIN authentication
//! - ISUPPORT (RPL_ISUPPORT) parsing with sensible defaults
//! - Arena-backed user and channel tracking with symmetric membership
//! - A sans-IO [`Network`] session that can be driven by any runtime
//! - Optional tokio transport: plain and TLS connections, bounded send
//!   queues, reconnection with exponential backoff and an [`EventBus`]

#![deny(clippy::all)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing and building messages
//!
//! ```rust
//! use slirc_client::{Message, Prefix};
//!
//! let msg: Message = "@time=2023-01-01T12:00:00Z :mk!mk@uplink.io PRIVMSG #channel :hello"
//!     .parse()
//!     .expect("valid IRC message");
//! assert_eq!(msg.prefix, Some(Prefix::new("mk", "mk", "uplink.io")));
//! assert_eq!(msg.tag_value("time"), Some("2023-01-01T12:00:00Z"));
//! assert_eq!(msg.params, ["#channel", "hello"]);
//!
//! let reply = Message::new("PRIVMSG", ["#channel", "hi there"]);
//! assert_eq!(reply.to_string(), "PRIVMSG #channel :hi there");
//! ```
//!
//! ### Driving a session by hand
//!
//! ```rust
//! use std::time::Instant;
//! use slirc_client::{Event, Message, Network, NetworkAction, NetworkConfig};
//!
//! let mut config = NetworkConfig::new("irc.example.com", "mk");
//! config.channels.push("#channel".into());
//! let mut network = Network::new(config).expect("valid config");
//! network.connected(Instant::now());
//!
//! let line: Message = ":irc.example.com 001 mk :Welcome".parse().unwrap();
//! let actions = network.feed(&line, Instant::now());
//! assert!(actions
//!     .iter()
//!     .any(|a| matches!(a.as_event(), Some(Event::ConnectionReady { .. }))));
//! assert!(actions
//!     .iter()
//!     .filter_map(NetworkAction::as_send)
//!     .any(|m| m.to_string() == "JOIN #channel"));
//! ```

pub mod caps;
pub mod casemap;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod network;
pub mod prefix;
pub mod sasl;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod bus;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod client;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod connection;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod irc;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod line;

pub use self::caps::{CapReply, CapSubCommand, Capability};
pub use self::casemap::{irc_eq, irc_to_lower, CaseMapping};
pub use self::config::{Config, NetworkConfig, SaslConfig};
pub use self::entity::{Channel, ChannelId, Roster, User, UserId};
pub use self::error::{
    ConfigError, ConnectError, HandlerError, IsupportError, MessageParseError, ProtocolError,
};
pub use self::event::{ChannelInfo, Event, EventKind, UserInfo};
pub use self::isupport::Isupport;
pub use self::message::{encode, Message, Tag, Tags};
pub use self::mode::{ModeChange, Sign};
pub use self::network::{Network, NetworkAction, SessionState};
pub use self::prefix::Prefix;
pub use self::sasl::{encode_plain, SaslMechanism};

#[cfg(feature = "tokio")]
pub use self::bus::EventBus;
#[cfg(feature = "tokio")]
pub use self::client::{Client, NetworkHandle};
#[cfg(feature = "tokio")]
pub use self::connection::{Connection, ConnectionEvent, ConnectionState};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
