use std::str::FromStr;

use crate::error::MessageParseError;
use crate::prefix::Prefix;

use super::nom_parser::ParsedMessage;
use super::tags::Tags;
use super::types::Message;

impl Message {
    /// Decode a single line. A trailing `\r\n` or `\n` is tolerated.
    ///
    /// Fails with [`MessageParseError::MissingCommand`] when the line has
    /// no command token.
    pub fn decode(line: &str) -> Result<Message, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let parsed = ParsedMessage::parse(line).map_err(|e| {
            if e.position >= line.len() || e.context == Some("parsing required command") {
                MessageParseError::MissingCommand
            } else {
                MessageParseError::ParseContext {
                    position: e.position,
                    context: e.context.unwrap_or("parsing message").to_owned(),
                }
            }
        })?;

        let tags = parsed.tags.map(Tags::parse).unwrap_or_default();
        let prefix = parsed.prefix.map(Prefix::new_from_str);

        Ok(Message {
            tags,
            prefix,
            command: parsed.command.to_owned(),
            params: parsed.params.into_iter().map(str::to_owned).collect(),
            explicit_trailing: parsed.trailing,
        })
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::decode(s)
    }
}
