use std::fmt;

use crate::error::ProtocolError;

use super::types::{Message, MAX_PARAMS};

/// Whether a string must be colon-prefixed as a trailing argument.
#[inline]
pub(crate) fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

impl Message {
    /// Check that the line would decode back into this same message.
    ///
    /// Only the last parameter may be empty, hold a space or open with
    /// `:`. No middle parameter may carry a line break. Past the parameter limit the overflow is folded into the
    /// trailing parameter, so those are not checked.
    pub fn check_wire_safe(&self) -> Result<(), ProtocolError> {
        if self.command.is_empty() || !self.command.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidCommand(self.command.clone()));
        }
        let middle = self.params.len().saturating_sub(1).min(MAX_PARAMS - 1);
        let broken = |p: &&String| needs_colon_prefix(p) || p.contains(['\r', '\n', '\0']);
        match self.params[..middle].iter().find(broken) {
            Some(param) => Err(ProtocolError::InvalidParameter {
                command: self.command.clone(),
                param: param.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            write!(f, "@{} ", self.tags)?;
        }

        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        f.write_str(&self.command)?;

        if self.params.is_empty() {
            return Ok(());
        }

        // Anything past the parameter limit is folded into the trailing one.
        if self.params.len() > MAX_PARAMS {
            let (middle, rest) = self.params.split_at(MAX_PARAMS - 1);
            for param in middle {
                write!(f, " {}", param)?;
            }
            return write!(f, " :{}", rest.join(" "));
        }

        let (middle, trailing) = self.params.split_at(self.params.len() - 1);
        for param in middle {
            write!(f, " {}", param)?;
        }

        let trailing = &trailing[0];
        if self.explicit_trailing || needs_colon_prefix(trailing) {
            write!(f, " :{}", trailing)
        } else {
            write!(f, " {}", trailing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefix::Prefix;

    #[test]
    fn test_colon_only_when_needed() {
        assert_eq!(Message::new("NICK", ["mk"]).to_string(), "NICK mk");
        assert_eq!(Message::new("CAP", ["LS"]).to_string(), "CAP LS");
        assert_eq!(
            Message::new("USER", ["mk", "void", "void", "Mk Bot"]).to_string(),
            "USER mk void void :Mk Bot"
        );
        assert_eq!(Message::new("TOPIC", ["#c", ""]).to_string(), "TOPIC #c :");
        assert_eq!(Message::new("PRIVMSG", ["#c", ":)"]).to_string(), "PRIVMSG #c ::)");
    }

    #[test]
    fn test_no_params() {
        assert_eq!(Message::new("QUIT", Vec::<String>::new()).to_string(), "QUIT");
    }

    #[test]
    fn test_prefix_and_tags() {
        let msg = Message::new("PRIVMSG", ["#c", "hi"])
            .with_prefix(Prefix::new("mk", "mk", "uplink.io"))
            .with_tag("account", Some("mk"));
        assert_eq!(msg.to_string(), "@account=mk :mk!mk@uplink.io PRIVMSG #c hi");
    }

    #[test]
    fn test_wire_safety() {
        assert!(Message::new("PRIVMSG", ["#c", "a b"]).check_wire_safe().is_ok());
        assert!(Message::new("TOPIC", ["#c", ""]).check_wire_safe().is_ok());
        assert!(Message::new("QUIT", Vec::<String>::new()).check_wire_safe().is_ok());

        for params in [["#a b", "hi"], ["", "hi"], [":x", "hi"], ["#a\nQUIT", "hi"]] {
            let err = Message::new("PRIVMSG", params).check_wire_safe().unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidParameter { .. }), "{:?}", params);
        }
        for command in ["", "PRIV MSG", "PING\r\nQUIT"] {
            let err = Message::new(command, ["x"]).check_wire_safe().unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidCommand(_)));
        }
    }

    #[test]
    fn test_param_overflow_folds_into_trailing() {
        let params: Vec<String> = (0..17).map(|i| format!("p{}", i)).collect();
        let line = Message::new("005", params).to_string();
        let decoded: Message = line.parse().unwrap();
        assert_eq!(decoded.params.len(), MAX_PARAMS);
        assert_eq!(decoded.params[MAX_PARAMS - 1], "p14 p15 p16");
    }
}
