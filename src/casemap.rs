//! IRC case-mapping functions.
//!
//! IRC uses a special case-insensitive comparison where some characters
//! are considered equivalent (e.g., `[` and `{`). Which characters fold
//! together is advertised by the server in the `CASEMAPPING` ISUPPORT
//! token; `rfc1459` is assumed until it says otherwise.

use std::fmt;
use std::str::FromStr;

/// A case-mapping scheme as advertised by `CASEMAPPING`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CaseMapping {
    /// Only `A-Z` fold to `a-z`.
    Ascii,
    /// ASCII plus `[]\~` fold to `{}|^`.
    #[default]
    Rfc1459,
    /// ASCII plus `[]\` fold to `{}|`; `~` and `^` stay distinct.
    StrictRfc1459,
}

impl CaseMapping {
    /// Fold a single character.
    #[inline]
    pub fn fold_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            (CaseMapping::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (CaseMapping::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Fold a whole string into its canonical lowercase form.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compare two strings under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold_char(ca) == self.fold_char(cb))
    }

    /// The name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseMapping::Ascii => "ascii",
            CaseMapping::Rfc1459 => "rfc1459",
            CaseMapping::StrictRfc1459 => "strict-rfc1459",
        }
    }
}

impl FromStr for CaseMapping {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(CaseMapping::Ascii),
            "rfc1459" => Ok(CaseMapping::Rfc1459),
            "strict-rfc1459" => Ok(CaseMapping::StrictRfc1459),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
///
/// In addition to ASCII lowercase conversion, this maps:
/// - `[` → `{`
/// - `]` → `}`
/// - `\` → `|`
/// - `~` → `^`
pub fn irc_to_lower(s: &str) -> String {
    CaseMapping::Rfc1459.fold(s)
}

/// Compare two strings using IRC case-insensitive comparison.
///
/// Uses the RFC 1459 case mapping where certain characters are equivalent.
pub fn irc_eq(a: &str, b: &str) -> bool {
    CaseMapping::Rfc1459.eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc1459() {
        assert_eq!(irc_to_lower("Nick[A]\\~"), "nick{a}|^");
        assert!(irc_eq("FOO[bar]", "foo{BAR}"));
        assert!(!irc_eq("foo", "fooo"));
    }

    #[test]
    fn test_strict_and_ascii() {
        assert_eq!(CaseMapping::StrictRfc1459.fold("A[~"), "a{~");
        assert_eq!(CaseMapping::Ascii.fold("A[~"), "a[~");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("ascii".parse(), Ok(CaseMapping::Ascii));
        assert_eq!("strict-rfc1459".parse(), Ok(CaseMapping::StrictRfc1459));
        assert!("rfc7613".parse::<CaseMapping>().is_err());
    }
}
