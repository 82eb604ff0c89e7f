//! SASL authentication helpers for IRC.
//!
//! Only the PLAIN mechanism is spoken. The payload is
//! `authzid NUL authcid NUL password`, base64-encoded and sent with
//! `AUTHENTICATE`, split into 400-byte chunks.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>
//!
//! # Example
//!
//! ```
//! use slirc_client::sasl::encode_plain;
//!
//! // "mk\0mk\0hunter2"
//! assert_eq!(encode_plain("mk", "hunter2"), "bWsAbWsAaHVudGVyMg==");
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single SASL message chunk (400 bytes).
///
/// SASL responses that exceed this length must be split into multiple
/// AUTHENTICATE commands.
pub const SASL_CHUNK_SIZE: usize = 400;

/// SASL mechanisms by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SaslMechanism {
    /// PLAIN mechanism (RFC 4616) - simple username/password.
    Plain,
    /// Anything else.
    Unknown(String),
}

impl SaslMechanism {
    /// Parse a mechanism name string.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => Self::Plain,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Returns the canonical name of this mechanism.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "PLAIN",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode PLAIN credentials where the authorization and authentication
/// identities are both `username`.
pub fn encode_plain(username: &str, password: &str) -> String {
    encode_plain_with_authzid(username, username, password)
}

/// Encode credentials for the PLAIN mechanism with an explicit authzid.
///
/// * `authzid` - The authorization identity (who to act as)
/// * `authcid` - The authentication identity (who is authenticating)
/// * `password` - The password
pub fn encode_plain_with_authzid(authzid: &str, authcid: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", authzid, authcid, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded SASL response into `AUTHENTICATE` arguments.
///
/// A response whose length is an exact multiple of the chunk size is
/// terminated by a lone `+`, so the server knows nothing more follows.
pub fn chunk_response(encoded: &str) -> Vec<&str> {
    if encoded.is_empty() {
        return vec!["+"];
    }
    // base64 is ASCII, so byte offsets are always char boundaries.
    let mut chunks: Vec<&str> = (0..encoded.len())
        .step_by(SASL_CHUNK_SIZE)
        .map(|start| &encoded[start..(start + SASL_CHUNK_SIZE).min(encoded.len())])
        .collect();
    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+");
    }
    chunks
}

/// Decode a base64-encoded SASL payload.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(data)
}
