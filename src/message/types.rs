use crate::prefix::Prefix;

use super::tags::Tags;

/// Maximum number of parameters a single line may carry.
pub const MAX_PARAMS: usize = 15;

/// An owned IRC message.
///
/// The command is kept verbatim; use [`Message::is`] for the
/// case-insensitive comparison dispatch relies on.
///
/// # Example
///
/// ```
/// use slirc_client::Message;
///
/// let msg: Message = ":mk!mk@uplink.io PRIVMSG #channel :hello".parse().unwrap();
/// assert_eq!(msg.source_nickname(), Some("mk"));
/// assert_eq!(msg.params, ["#channel", "hello"]);
/// assert_eq!(msg.to_string(), ":mk!mk@uplink.io PRIVMSG #channel :hello");
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// IRCv3 message tags. Empty when the line carried none.
    pub tags: Tags,
    /// Message prefix/source.
    pub prefix: Option<Prefix>,
    /// The command or three digit numeric, as received.
    pub command: String,
    /// Positional parameters, the trailing one included.
    pub params: Vec<String>,
    /// Whether the last parameter is written with a `:` even when it
    /// would not need one. Set by the decoder to preserve the line.
    pub explicit_trailing: bool,
}

impl Message {
    /// Create a message from a command and its parameters.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message {
            tags: Tags::new(),
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
            explicit_trailing: false,
        }
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Attach a tag.
    #[must_use]
    pub fn with_tag(mut self, key: &str, value: Option<&str>) -> Self {
        self.tags.insert(key, value.map(str::to_owned));
        self
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric reply code, if the command is exactly three digits.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The nickname from a user prefix.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Value of an IRCv3 tag.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }
}

/// Build the wire line for `command` and `params`, without the line
/// terminator. A `:` is added to the last parameter only when required.
///
/// ```
/// use slirc_client::message::encode;
///
/// assert_eq!(encode("PONG", &["12345"]), "PONG 12345");
/// assert_eq!(encode("PRIVMSG", &["#rust", "hi there"]), "PRIVMSG #rust :hi there");
/// ```
pub fn encode(command: &str, params: &[&str]) -> String {
    Message::new(command, params.iter().copied()).to_string()
}
