//! Error types for the IRC client engine.
//!
//! Errors are grouped by where they surface: the wire codec
//! ([`ProtocolError`], [`MessageParseError`]), the transport
//! ([`ConnectError`]), configuration ([`ConfigError`]), session handlers
//! ([`HandlerError`]) and ISUPPORT tokens ([`IsupportError`]).

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Codec-level errors raised while framing or decoding the byte stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded the maximum allowed length.
    #[error("message too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Observed length in bytes.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Illegal control character in a line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// Command token that would not survive the trip to the server.
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),

    /// Middle parameter that would split or merge on the wire.
    #[error("invalid parameter {param:?} for {command}")]
    InvalidParameter {
        /// Command the parameter belongs to.
        command: String,
        /// The offending parameter.
        param: String,
    },

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when decoding a single IRC line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// The line carries no command token.
    #[error("malformed message: missing command")]
    MissingCommand,

    /// Invalid message prefix.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Parsing error with position information.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Character position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}

/// Failures establishing a connection. None of these transition the
/// connection out of `Disconnected`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// Hostname could not be resolved.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        /// Hostname that failed to resolve.
        host: String,
        /// Resolver error.
        #[source]
        source: std::io::Error,
    },

    /// Every resolved address refused or failed the TCP connect.
    #[error("connection to {addr} refused: {source}")]
    Refused {
        /// Address that was tried last.
        addr: String,
        /// Socket error.
        #[source]
        source: std::io::Error,
    },

    /// The hostname is not a valid TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// TLS handshake failed.
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        /// Remote host.
        host: String,
        /// Handshake error.
        #[source]
        source: std::io::Error,
    },

    /// The attempt did not complete within the connect timeout.
    #[error("connection to {0} timed out")]
    Timeout(String),

    /// Any other I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. Raised before any connection is attempted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Errors raised by a single message handler. These are logged at the
/// dispatch boundary and never abort the read loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandlerError {
    /// The message carried fewer parameters than the handler needs.
    #[error("{command}: not enough parameters: expected {expected}, got {got}")]
    NotEnoughParams {
        /// Command being handled.
        command: String,
        /// Minimum parameter count.
        expected: usize,
        /// Actual parameter count.
        got: usize,
    },

    /// The message needs a user source but carried none.
    #[error("{0}: message has no user source")]
    NoSource(String),
}

/// A single ISUPPORT token that could not be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IsupportError {
    /// A numeric parameter carried a non-integer value.
    #[error("ISUPPORT {key}: expected an integer, got {value:?}")]
    InvalidInteger {
        /// Parameter name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// A structured parameter could not be parsed.
    #[error("ISUPPORT {key}: malformed value {value:?}")]
    InvalidValue {
        /// Parameter name.
        key: String,
        /// Raw value.
        value: String,
    },
}
