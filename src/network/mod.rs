//! Sans-IO network session.
//!
//! A [`Network`] is the protocol state machine for one server. It does no
//! I/O of its own: the owner reports transport lifecycle
//! ([`Network::connected`], [`Network::disconnected`]), feeds decoded
//! messages ([`Network::feed`]) and polls timers
//! ([`Network::poll_keepalive`]). Each call returns the
//! [`NetworkAction`]s the owner must carry out, in order.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use slirc_client::{Message, Network, NetworkAction, NetworkConfig};
//!
//! let mut network = Network::new(NetworkConfig::new("irc.example.com", "mk")).unwrap();
//! let actions = network.connected(Instant::now());
//! let lines: Vec<String> = actions
//!     .iter()
//!     .filter_map(NetworkAction::as_send)
//!     .map(|m| m.to_string())
//!     .collect();
//! assert_eq!(lines, ["CAP LS", "NICK mk", "USER mk void void mk"]);
//!
//! let ping: Message = "PING :12345".parse().unwrap();
//! let actions = network.feed(&ping, Instant::now());
//! assert_eq!(actions[0].as_send().unwrap().to_string(), "PONG 12345");
//! ```

mod dispatch;
mod handshake;
mod keepalive;

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::entity::{ChannelId, Roster, UserId};
use crate::error::ConfigError;
use crate::event::{ChannelInfo, Event, UserInfo};
use crate::isupport::Isupport;
use crate::message::Message;

use self::keepalive::{Keepalive, KeepaliveAction};

pub use self::keepalive::{CHECK_INTERVAL, PONG_TIMEOUT};

/// Where the session is in its handshake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    #[default]
    Idle,
    /// `CAP LS` sent, negotiating extensions.
    CapNegotiating,
    /// SASL exchange in progress.
    Authenticating,
    /// Negotiation ended, waiting for the welcome numeric.
    Registering,
    /// Welcome received.
    Registered,
}

/// Something the owner of a [`Network`] must do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkAction {
    /// Queue this message on the connection.
    ///
    /// Boxed to reduce enum size variance (Message is large).
    Send(Box<Message>),
    /// Publish this event.
    Emit(Event),
    /// Close the connection.
    Close {
        /// Why.
        reason: String,
        /// Whether the owner should reconnect afterwards.
        reconnect: bool,
        /// Drop the socket without flushing. Set when the server stopped
        /// answering, since a flush could wait on it forever.
        force: bool,
    },
}

impl NetworkAction {
    /// The message, if this is a send.
    pub fn as_send(&self) -> Option<&Message> {
        match self {
            NetworkAction::Send(msg) => Some(msg),
            _ => None,
        }
    }

    /// The event, if this is an emit.
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            NetworkAction::Emit(event) => Some(event),
            _ => None,
        }
    }
}

/// Protocol state for one server connection.
#[derive(Debug)]
pub struct Network {
    id: String,
    config: NetworkConfig,
    nickname: String,
    desired_nick: String,
    state: SessionState,
    waiting_for_cap: bool,
    ready: bool,
    quitting: bool,
    auth_failed: bool,
    own_modes: String,
    ls_buffer: Vec<String>,
    server_caps: Vec<String>,
    enabled_caps: BTreeSet<String>,
    isupport: Isupport,
    roster: Roster,
    keepalive: Keepalive,
    pending: Vec<NetworkAction>,
}

impl Network {
    /// Build a session. Fails before any connection attempt if the
    /// configuration lacks a hostname or nickname.
    pub fn new(config: NetworkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let isupport = Isupport::new();
        let mut network = Network {
            id: config.id(),
            nickname: config.nickname.clone(),
            desired_nick: config.nickname.clone(),
            state: SessionState::Idle,
            waiting_for_cap: false,
            ready: false,
            quitting: false,
            auth_failed: false,
            own_modes: String::new(),
            ls_buffer: Vec::new(),
            server_caps: Vec::new(),
            enabled_caps: BTreeSet::new(),
            roster: Roster::new(isupport.casemapping()),
            isupport,
            keepalive: Keepalive::new(config.ping_interval()),
            pending: Vec::new(),
            config,
        };
        network.precreate_channels();
        Ok(network)
    }

    fn precreate_channels(&mut self) {
        let names: Vec<String> = self.config.channel_names().map(str::to_owned).collect();
        for name in names {
            self.roster.find_or_create_channel(&name);
        }
    }

    /// Network id, `hostname:port` unless configured.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The configuration this session was built from.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Our current nickname.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Handshake state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether `connection_ready` has fired on this connection.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether capability negotiation is still open.
    pub fn is_waiting_for_cap(&self) -> bool {
        self.waiting_for_cap
    }

    /// Our own user modes.
    pub fn modes(&self) -> &str {
        &self.own_modes
    }

    /// Every capability the server advertised.
    pub fn server_capabilities(&self) -> &[String] {
        &self.server_caps
    }

    /// Capabilities the server acknowledged.
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.enabled_caps
    }

    /// Server-advertised parameters.
    pub fn isupport(&self) -> &Isupport {
        &self.isupport
    }

    /// Tracked users and channels.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// When PING or PONG traffic was last seen on this connection.
    pub fn last_pong(&self) -> Option<Instant> {
        self.keepalive.last_seen()
    }

    /// Whether SASL credentials are configured.
    pub fn sasl_enabled(&self) -> bool {
        self.config.sasl.is_some()
    }

    /// Whether the owner should reconnect once the connection is gone.
    pub fn should_reconnect(&self) -> bool {
        self.config.reconnect && !self.quitting && !self.auth_failed
    }

    /// The transport is up: start the handshake.
    pub fn connected(&mut self, now: Instant) -> Vec<NetworkAction> {
        info!(network = %self.id, "connection established");
        self.state = SessionState::CapNegotiating;
        self.waiting_for_cap = true;
        self.ready = false;
        self.ls_buffer.clear();
        self.server_caps.clear();
        self.enabled_caps.clear();
        self.desired_nick = self.config.nickname.clone();
        self.keepalive.start(now);

        self.transmit("CAP", &["LS"]);
        if let Some(password) = self.config.password.clone() {
            self.transmit("PASS", &[&password]);
        }
        let nick = self.desired_nick.clone();
        self.transmit("NICK", &[&nick]);
        let username = self.config.username().to_owned();
        let realname = self.config.realname().to_owned();
        self.transmit("USER", &[&username, "void", "void", &realname]);

        self.take_actions()
    }

    /// The transport is gone. Clears all tracked state and emits
    /// `connection_close`. Calling it again before the next
    /// [`Network::connected`] does nothing.
    pub fn disconnected(&mut self) -> Vec<NetworkAction> {
        if self.state == SessionState::Idle {
            return self.take_actions();
        }
        info!(network = %self.id, "disconnected");
        self.state = SessionState::Idle;
        self.waiting_for_cap = false;
        self.ready = false;
        self.own_modes.clear();
        self.keepalive.stop();
        self.roster.clear();
        self.isupport.reset();
        self.roster.set_casemapping(self.isupport.casemapping());
        self.precreate_channels();
        self.emit(Event::ConnectionClose {
            network: self.id.clone(),
        });
        self.take_actions()
    }

    /// Feed one decoded message.
    pub fn feed(&mut self, msg: &Message, now: Instant) -> Vec<NetworkAction> {
        self.dispatch(msg, now);
        self.take_actions()
    }

    /// Run keepalive checks due at `now`.
    pub fn poll_keepalive(&mut self, now: Instant) -> Vec<NetworkAction> {
        match self.keepalive.poll(now) {
            KeepaliveAction::Idle => {}
            KeepaliveAction::SendPing => {
                debug!(network = %self.id, "link quiet, pinging server");
                let token = chrono::Utc::now().timestamp().to_string();
                self.transmit("PING", &[&token]);
            }
            KeepaliveAction::TimedOut => {
                warn!(network = %self.id, "no PONG from server, closing connection");
                self.pending.push(NetworkAction::Close {
                    reason: "ping timeout".to_owned(),
                    reconnect: self.should_reconnect(),
                    force: true,
                });
            }
        }
        self.take_actions()
    }

    /// When [`Network::poll_keepalive`] next has work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.keepalive.next_wakeup()
    }

    /// Queue a command. Collect it with [`Network::take_actions`].
    pub fn transmit(&mut self, command: &str, params: &[&str]) {
        self.send(Message::new(command, params.iter().copied()));
    }

    /// Send a PRIVMSG.
    pub fn say(&mut self, target: &str, text: &str) {
        self.transmit("PRIVMSG", &[target, text]);
    }

    /// Join a channel.
    pub fn join(&mut self, channel: &str) {
        self.transmit("JOIN", &[channel]);
    }

    /// Quit the network. No reconnect follows.
    pub fn quit(&mut self, reason: Option<&str>) {
        self.quitting = true;
        let reason = reason
            .map(str::to_owned)
            .or_else(|| self.config.quit_message.clone());
        match reason {
            Some(reason) => self.transmit("QUIT", &[&reason]),
            None => self.transmit("QUIT", &[]),
        }
    }

    /// Drain queued actions.
    pub fn take_actions(&mut self) -> Vec<NetworkAction> {
        std::mem::take(&mut self.pending)
    }

    fn send(&mut self, msg: Message) {
        self.pending.push(NetworkAction::Send(Box::new(msg)));
    }

    fn emit(&mut self, event: Event) {
        self.pending.push(NetworkAction::Emit(event));
    }

    fn close(&mut self, reason: &str, reconnect: bool) {
        self.pending.push(NetworkAction::Close {
            reason: reason.to_owned(),
            reconnect,
            force: false,
        });
    }

    fn is_me(&self, nick: &str) -> bool {
        self.roster.casemapping().eq(nick, &self.nickname)
    }

    fn user_info(&self, id: UserId) -> UserInfo {
        self.roster.user(id).map(UserInfo::from).unwrap_or_default()
    }

    fn channel_info(&self, id: ChannelId) -> ChannelInfo {
        match self.roster.channel(id) {
            Some(channel) => ChannelInfo::snapshot(channel, |uid| {
                self.roster.user(*uid).map(|u| u.nick.as_str())
            }),
            None => ChannelInfo::default(),
        }
    }
}
