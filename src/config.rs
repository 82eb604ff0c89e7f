//! Client configuration.
//!
//! ```toml
//! [[networks]]
//! hostname = "irc.libera.chat"
//! nickname = "slirc"
//! secure = true
//! channels = ["#rust", { name = "#slirc" }]
//!
//! [networks.sasl]
//! username = "slirc"
//! password = "hunter2"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration: one entry per network.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Networks to connect to.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        for network in &config.networks {
            network.validate()?;
        }
        Ok(config)
    }
}

/// SASL PLAIN credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaslConfig {
    /// Account name, used as both authorization and authentication identity.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// A channel entry: either `"#name"` or `{ name = "#name" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChannelEntry {
    /// Bare channel name.
    Name(String),
    /// Table form.
    Table {
        /// Channel name.
        name: String,
    },
}

impl From<&str> for ChannelEntry {
    fn from(name: &str) -> Self {
        ChannelEntry::Name(name.to_owned())
    }
}

impl ChannelEntry {
    /// The channel name.
    pub fn name(&self) -> &str {
        match self {
            ChannelEntry::Name(name) | ChannelEntry::Table { name } => name,
        }
    }
}

/// One network's settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Explicit network id. Defaults to `hostname:port`.
    pub id: Option<String>,
    /// Server hostname.
    pub hostname: String,
    /// Server port. Defaults to 6697 with TLS, 6667 without.
    pub port: Option<u16>,
    /// Desired nickname.
    pub nickname: String,
    /// Username. Defaults to the nickname.
    pub username: Option<String>,
    /// Real name. Defaults to the nickname.
    pub realname: Option<String>,
    /// Server password sent with `PASS`.
    pub password: Option<String>,
    /// Connect with TLS.
    #[serde(default)]
    pub secure: bool,
    /// SASL PLAIN credentials.
    pub sasl: Option<SaslConfig>,
    /// Channels to join once registered.
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
    /// Additional capabilities to request if offered.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Seconds of silence before we ping the server.
    #[serde(default = "default_ping_interval")]
    pub server_ping_interval: u64,
    /// Seconds allowed for the TCP and TLS handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Reconnect after the connection drops.
    #[serde(default = "default_true")]
    pub reconnect: bool,
    /// Base reconnect delay in seconds, doubled per failed attempt.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
    /// Upper bound on the reconnect delay in seconds.
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay: u64,
    /// Outbound queue capacity in lines.
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
    /// Message sent with `QUIT` on shutdown.
    pub quit_message: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_ping_interval() -> u64 {
    150
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    3
}

fn default_reconnect_max_delay() -> u64 {
    300
}

fn default_send_queue_capacity() -> usize {
    512
}

impl NetworkConfig {
    /// Settings for `hostname` with every optional field at its default.
    pub fn new(hostname: impl Into<String>, nickname: impl Into<String>) -> Self {
        NetworkConfig {
            id: None,
            hostname: hostname.into(),
            port: None,
            nickname: nickname.into(),
            username: None,
            realname: None,
            password: None,
            secure: false,
            sasl: None,
            channels: Vec::new(),
            capabilities: Vec::new(),
            server_ping_interval: default_ping_interval(),
            connect_timeout: default_connect_timeout(),
            reconnect: true,
            reconnect_delay: default_reconnect_delay(),
            reconnect_max_delay: default_reconnect_max_delay(),
            send_queue_capacity: default_send_queue_capacity(),
            quit_message: None,
        }
    }

    /// Fail if a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingField("hostname"));
        }
        if self.nickname.trim().is_empty() {
            return Err(ConfigError::MissingField("nickname"));
        }
        if let Some(ref sasl) = self.sasl {
            if sasl.username.is_empty() {
                return Err(ConfigError::MissingField("sasl.username"));
            }
        }
        Ok(())
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.secure { 6697 } else { 6667 })
    }

    /// Effective network id.
    pub fn id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.hostname, self.port()))
    }

    /// Effective username.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    /// Effective real name.
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }

    /// Configured channel names.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(ChannelEntry::name)
    }

    /// Keepalive threshold.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.server_ping_interval)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Delay before reconnect attempt number `attempt` (zero based):
    /// `reconnect_delay * 2^attempt`, capped at `reconnect_max_delay`.
    pub fn reconnect_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let secs = self
            .reconnect_delay
            .saturating_mul(factor)
            .min(self.reconnect_max_delay);
        Duration::from_secs(secs)
    }
}
