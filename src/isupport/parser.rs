//! Named parsers for structured ISUPPORT values.

use std::collections::BTreeMap;

use crate::error::IsupportError;

/// Parsed `PREFIX` token: channel status modes paired with their display
/// glyphs, ordered from most to least privileged.
///
/// # Example
///
/// ```
/// use slirc_client::isupport::PrefixMap;
///
/// let map = PrefixMap::parse("(qaohv)~&@%+").unwrap();
/// assert_eq!(map.prefix_for_mode('o'), Some('@'));
/// assert_eq!(map.mode_for_prefix('~'), Some('q'));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixMap(Vec<(char, char)>);

impl PrefixMap {
    /// Parse a `PREFIX` value like `(ov)@+`. An empty value means the
    /// server has no status prefixes.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() {
            return Some(PrefixMap(Vec::new()));
        }
        let rest = s.strip_prefix('(')?;
        let (modes, prefixes) = rest.split_once(')')?;
        if modes.is_empty() {
            return None;
        }
        Some(PrefixMap(modes.chars().zip(prefixes.chars()).collect()))
    }

    /// Returns true if the given character is a prefix mode on this server.
    #[inline]
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.0.iter().any(|&(m, _)| m == mode)
    }

    /// Returns the prefix symbol for a given mode character.
    #[inline]
    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.0.iter().find(|&&(m, _)| m == mode).map(|&(_, p)| p)
    }

    /// Returns the mode character for a given prefix symbol.
    #[inline]
    pub fn mode_for_prefix(&self, prefix: char) -> Option<char> {
        self.0.iter().find(|&&(_, p)| p == prefix).map(|&(m, _)| m)
    }

    /// Split leading status glyphs off a NAMES entry, returning the
    /// corresponding modes and the remainder.
    pub fn strip<'a>(&self, entry: &'a str) -> (String, &'a str) {
        let mut modes = String::new();
        let mut rest = entry;
        while let Some(c) = rest.chars().next() {
            match self.mode_for_prefix(c) {
                Some(m) => {
                    modes.push(m);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        (modes, rest)
    }

    /// Iterate over `(mode, glyph)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.0.iter().copied()
    }
}

impl Default for PrefixMap {
    fn default() -> Self {
        PrefixMap(vec![('o', '@'), ('v', '+')])
    }
}

/// Parsed `CHANMODES` token.
///
/// Channel modes are divided into four categories (A, B, C, D):
/// - **A**: List modes (e.g., `b` for ban)
/// - **B**: Modes with a parameter for both +/- (e.g., `k` for key)
/// - **C**: Modes with a parameter only for + (e.g., `l` for limit)
/// - **D**: Modes without parameters (e.g., `n` for no external messages)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChanModes {
    /// Type A: List modes (always have a parameter).
    pub a: String,
    /// Type B: Modes that always require a parameter.
    pub b: String,
    /// Type C: Modes that require a parameter when set.
    pub c: String,
    /// Type D: Modes that never have a parameter.
    pub d: String,
}

impl ChanModes {
    /// Parse a `CHANMODES` value like `b,k,l,imnpst`. Missing groups are
    /// empty; groups beyond the fourth are ignored.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split(',').map(str::to_owned);
        ChanModes {
            a: parts.next().unwrap_or_default(),
            b: parts.next().unwrap_or_default(),
            c: parts.next().unwrap_or_default(),
            d: parts.next().unwrap_or_default(),
        }
    }
}

/// Parse `pfx:num[,pfx:num...]` as used by `CHANLIMIT` and `MAXLIST`.
/// Each character of `pfx` gets the limit; an empty `num` is unbounded.
pub fn parse_limits(key: &str, value: &str) -> Result<BTreeMap<char, Option<u32>>, IsupportError> {
    let mut limits = BTreeMap::new();
    for part in value.split(',').filter(|p| !p.is_empty()) {
        let (prefixes, limit) = part.split_once(':').unwrap_or((part, ""));
        let limit = if limit.is_empty() {
            None
        } else {
            Some(parse_int(key, limit)?)
        };
        for prefix in prefixes.chars() {
            limits.insert(prefix, limit);
        }
    }
    Ok(limits)
}

/// Parse a numeric parameter.
pub fn parse_int(key: &str, value: &str) -> Result<u32, IsupportError> {
    value.parse().map_err(|_| IsupportError::InvalidInteger {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
