//! Line-based codec for tokio.
//!
//! Splits the inbound byte stream on `\n` and writes outbound lines as-is.
//! Inbound bytes that are not valid UTF-8 are decoded lossily: servers
//! relay whatever their users send, and one legacy-encoded message must
//! not end the session.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error;

/// Room for 8191 bytes of IRCv3 tags on top of a 512 byte line.
pub const DEFAULT_MAX_LEN: usize = 8191 + 512;

/// Whether `c` may never appear on the wire. Formatting codes (bold,
/// colour and friends) are ordinary message content for a client, so only
/// NUL is rejected.
#[inline]
pub fn is_illegal_control_char(c: char) -> bool {
    c == '\0'
}

/// Line-based codec that handles newline-terminated messages.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Codec with the default length limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    /// Codec with a custom length limit, line ending included.
    pub fn with_max_len(max_len: usize) -> Self {
        LineCodec {
            next_index: 0,
            max_len,
        }
    }

    /// The length limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn validate_line(s: &str) -> error::Result<()> {
        match s.chars().find(|&c| is_illegal_control_char(c)) {
            Some(ch) => Err(error::ProtocolError::IllegalControlChar(ch)),
            None => Ok(()),
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let data = match String::from_utf8(line.to_vec()) {
                Ok(data) => data,
                Err(e) => {
                    debug!(
                        byte_pos = e.utf8_error().valid_up_to(),
                        "non-UTF-8 line, decoding lossily"
                    );
                    String::from_utf8_lossy(&line).into_owned()
                }
            };
            Self::validate_line(&data)?;
            Ok(Some(data))
        } else {
            self.next_index = src.len();
            if src.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }
            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(msg.as_bytes());
        Ok(())
    }
}
