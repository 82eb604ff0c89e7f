//! IRC message codec for tokio.
//!
//! Wraps [`LineCodec`] and turns lines into [`Message`]s. A line the
//! server garbled is logged and skipped rather than returned as an error,
//! since a framed stream ends at its first decode error.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

use crate::error::{self, ProtocolError};
use crate::line::{is_illegal_control_char, LineCodec};
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
#[derive(Default)]
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Codec with the default line limit.
    pub fn new() -> Self {
        IrcCodec {
            inner: LineCodec::new(),
        }
    }

    /// Codec with a custom line limit in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        IrcCodec {
            inner: LineCodec::with_max_len(max_len),
        }
    }

    /// Sanitize an outgoing line.
    ///
    /// - Truncates at the first line ending, so a parameter cannot smuggle
    ///   in a second command
    /// - Rejects NUL
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }
        if let Some(ch) = data.chars().find(|&c| is_illegal_control_char(c)) {
            return Err(ProtocolError::IllegalControlChar(ch));
        }
        Ok(data)
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        loop {
            let line = match self.inner.decode(src) {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(ProtocolError::IllegalControlChar(ch)) => {
                    warn!(?ch, "dropping line with illegal control character");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                continue;
            }
            trace!("← {}", trimmed);
            match Message::decode(trimmed) {
                Ok(msg) => return Ok(Some(msg)),
                Err(cause) => {
                    let err = ProtocolError::InvalidMessage {
                        string: trimmed.to_owned(),
                        cause,
                    };
                    warn!(error = %err, "dropping malformed line");
                }
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        msg.check_wire_safe()?;
        let mut line = Self::sanitize(msg.to_string())?;
        trace!("→ {}", line);
        line.push_str("\r\n");
        self.inner.encode(line, dst)
    }
}
