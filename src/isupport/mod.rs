//! ISUPPORT (`RPL_ISUPPORT`, numeric 005) table.
//!
//! The table is pre-populated with the defaults of the ISUPPORT draft so
//! lookups never fail against servers that send nothing. Tokens are
//! applied as they arrive: `KEY` sets a flag, `KEY=VALUE` goes through a
//! named parser for known keys, and `-KEY` restores the default.
//!
//! ```
//! use slirc_client::isupport::Isupport;
//!
//! let mut isupport = Isupport::new();
//! assert_eq!(isupport.prefix().prefix_for_mode('o'), Some('@'));
//! assert_eq!(isupport.nicklen(), 9);
//!
//! isupport.apply_tokens(["NICKLEN=30", "PREFIX=(qov)~@+", "EXCEPTS"]);
//! assert_eq!(isupport.nicklen(), 30);
//! assert_eq!(isupport.prefix().mode_for_prefix('~'), Some('q'));
//! assert!(isupport.is_set("EXCEPTS"));
//! ```

mod parser;

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::casemap::CaseMapping;
use crate::error::IsupportError;
use crate::mode::Sign;

pub use self::parser::{parse_int, parse_limits, ChanModes, PrefixMap};

/// Parameters that are always coerced to integers.
pub const NUMERIC_PARAMS: &[&str] = &[
    "CHANNELLEN",
    "MODES",
    "NICKLEN",
    "KICKLEN",
    "TOPICLEN",
    "AWAYLEN",
    "MAXCHANNELS",
    "MAXBANS",
    "MAXPARA",
    "MAXTARGETS",
];

/// A typed ISUPPORT value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IsupportValue {
    /// Present without a value.
    Flag,
    /// One of [`NUMERIC_PARAMS`].
    Int(u32),
    /// Any value without a named parser.
    Str(String),
    /// `PREFIX`.
    Prefix(PrefixMap),
    /// `CHANMODES`.
    ChanModes(ChanModes),
    /// `CHANLIMIT` / `MAXLIST`. `None` is unbounded.
    Limits(BTreeMap<char, Option<u32>>),
    /// `CHANTYPES`.
    Chars(Vec<char>),
}

/// Server-advertised parameters with defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Isupport {
    values: HashMap<String, IsupportValue>,
}

impl Default for Isupport {
    fn default() -> Self {
        Self::new()
    }
}

fn default_value(key: &str) -> Option<IsupportValue> {
    let unbounded = || BTreeMap::from([('#', None), ('&', None)]);
    Some(match key {
        "MODES" => IsupportValue::Int(3),
        "PREFIX" => IsupportValue::Prefix(PrefixMap::default()),
        "KICKLEN" => IsupportValue::Int(200),
        "NICKLEN" => IsupportValue::Int(9),
        "MAXLIST" => IsupportValue::Limits(unbounded()),
        "TOPICLEN" => IsupportValue::Int(200),
        "CHANMODES" => IsupportValue::ChanModes(ChanModes::default()),
        "CHANTYPES" => IsupportValue::Chars(vec!['#', '&']),
        "CHANLIMIT" => IsupportValue::Limits(unbounded()),
        "CHANNELLEN" => IsupportValue::Int(200),
        "CASEMAPPING" => IsupportValue::Str(CaseMapping::Rfc1459.as_str().to_owned()),
        _ => return None,
    })
}

const DEFAULT_KEYS: &[&str] = &[
    "MODES",
    "PREFIX",
    "KICKLEN",
    "NICKLEN",
    "MAXLIST",
    "TOPICLEN",
    "CHANMODES",
    "CHANTYPES",
    "CHANLIMIT",
    "CHANNELLEN",
    "CASEMAPPING",
];

impl Isupport {
    /// A table holding only the defaults.
    pub fn new() -> Self {
        let values = DEFAULT_KEYS
            .iter()
            .filter_map(|&k| default_value(k).map(|v| (k.to_owned(), v)))
            .collect();
        Isupport { values }
    }

    /// Restore every default and forget everything the server sent.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Apply a single `KEY`, `KEY=VALUE` or `-KEY` token.
    pub fn apply_token(&mut self, token: &str) -> Result<(), IsupportError> {
        if let Some(key) = token.strip_prefix('-') {
            self.restore_default(key);
            return Ok(());
        }

        // A numeric key without a value lifts the limit.
        let (key, value) = token.split_once('=').unwrap_or((token, ""));
        if value.is_empty() && NUMERIC_PARAMS.contains(&key) {
            self.restore_default(key);
            return Ok(());
        }
        if !token.contains('=') {
            self.values.insert(token.to_owned(), IsupportValue::Flag);
            return Ok(());
        }

        let invalid = || IsupportError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        };

        let parsed = match key {
            "PREFIX" => IsupportValue::Prefix(PrefixMap::parse(value).ok_or_else(invalid)?),
            "CHANMODES" => IsupportValue::ChanModes(ChanModes::parse(value)),
            "CHANLIMIT" | "MAXLIST" => IsupportValue::Limits(parse_limits(key, value)?),
            "CHANTYPES" => IsupportValue::Chars(value.chars().collect()),
            "CASEMAPPING" => {
                if value.parse::<CaseMapping>().is_err() {
                    return Err(invalid());
                }
                IsupportValue::Str(value.to_ascii_lowercase())
            }
            k if NUMERIC_PARAMS.contains(&k) => IsupportValue::Int(parse_int(key, value)?),
            _ => IsupportValue::Str(value.to_owned()),
        };
        self.values.insert(key.to_owned(), parsed);
        Ok(())
    }

    fn restore_default(&mut self, key: &str) {
        match default_value(key) {
            Some(v) => self.values.insert(key.to_owned(), v),
            None => self.values.remove(key),
        };
    }

    /// Apply a run of tokens. Bad tokens are logged and skipped.
    pub fn apply_tokens<'a, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for token in tokens {
            if token.is_empty() {
                continue;
            }
            if let Err(e) = self.apply_token(token) {
                warn!(error = %e, "ignoring ISUPPORT token");
            }
        }
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&IsupportValue> {
        self.values.get(key)
    }

    /// Whether a key is present in any form.
    pub fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Integer value of a numeric parameter.
    ///
    /// `None` means no limit: the key was never sent, or was sent bare
    /// and has no default.
    pub fn int(&self, key: &str) -> Option<u32> {
        match self.values.get(key) {
            Some(IsupportValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// String value of a parameter without a named parser.
    pub fn str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(IsupportValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// `PREFIX`. Falls back to `(ov)@+` if it was removed.
    pub fn prefix(&self) -> PrefixMap {
        match self.values.get("PREFIX") {
            Some(IsupportValue::Prefix(p)) => p.clone(),
            _ => PrefixMap::default(),
        }
    }

    /// `NICKLEN`.
    pub fn nicklen(&self) -> u32 {
        self.int("NICKLEN").unwrap_or(9)
    }

    /// `MODES`: how many argument-taking modes fit in one MODE line.
    pub fn modes(&self) -> u32 {
        self.int("MODES").unwrap_or(3)
    }

    /// `CHANMODES`.
    pub fn chanmodes(&self) -> ChanModes {
        match self.values.get("CHANMODES") {
            Some(IsupportValue::ChanModes(c)) => c.clone(),
            _ => ChanModes::default(),
        }
    }

    /// `CHANTYPES`.
    pub fn chantypes(&self) -> Vec<char> {
        match self.values.get("CHANTYPES") {
            Some(IsupportValue::Chars(c)) => c.clone(),
            _ => vec!['#', '&'],
        }
    }

    /// The join limit for a channel prefix. `Some(None)` is unbounded,
    /// `None` means the prefix is not listed.
    pub fn chanlimit(&self, prefix: char) -> Option<Option<u32>> {
        match self.values.get("CHANLIMIT") {
            Some(IsupportValue::Limits(l)) => l.get(&prefix).copied(),
            _ => None,
        }
    }

    /// `CASEMAPPING`, defaulting to `rfc1459` for unrecognised values.
    pub fn casemapping(&self) -> CaseMapping {
        self.str("CASEMAPPING")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// `NETWORK`, if advertised.
    pub fn network(&self) -> Option<&str> {
        self.str("NETWORK")
    }

    /// Whether `name` starts with one of the channel type characters.
    pub fn is_channel(&self, name: &str) -> bool {
        name.chars()
            .next()
            .is_some_and(|c| self.chantypes().contains(&c))
    }

    /// Whether a channel mode consumes an argument in the given direction.
    pub fn mode_takes_arg(&self, mode: char, sign: Sign) -> bool {
        if self.prefix().is_prefix_mode(mode) {
            return true;
        }
        let chanmodes = self.chanmodes();
        if chanmodes.a.contains(mode) || chanmodes.b.contains(mode) {
            return true;
        }
        chanmodes.c.contains(mode) && sign == Sign::Plus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let isupport = Isupport::new();
        assert_eq!(isupport.prefix().prefix_for_mode('o'), Some('@'));
        assert_eq!(isupport.prefix().prefix_for_mode('v'), Some('+'));
        assert_eq!(isupport.nicklen(), 9);
        assert_eq!(isupport.modes(), 3);
        assert_eq!(isupport.int("KICKLEN"), Some(200));
        assert_eq!(isupport.int("TOPICLEN"), Some(200));
        assert_eq!(isupport.int("CHANNELLEN"), Some(200));
        assert_eq!(isupport.chantypes(), vec!['#', '&']);
        assert_eq!(isupport.chanlimit('#'), Some(None));
        assert_eq!(isupport.casemapping(), CaseMapping::Rfc1459);
        assert_eq!(isupport.chanmodes(), ChanModes::default());
    }

    #[test]
    fn flags_and_raw_strings() {
        let mut isupport = Isupport::new();
        isupport.apply_tokens(["EXCEPTS", "NETWORK=Libera.Chat", "STATUSMSG=@+"]);
        assert_eq!(isupport.get("EXCEPTS"), Some(&IsupportValue::Flag));
        assert_eq!(isupport.network(), Some("Libera.Chat"));
        assert_eq!(isupport.str("STATUSMSG"), Some("@+"));
    }

    #[test]
    fn numeric_params_are_integers() {
        let mut isupport = Isupport::new();
        isupport.apply_tokens(["AWAYLEN=390", "MAXTARGETS=4"]);
        assert_eq!(isupport.get("AWAYLEN"), Some(&IsupportValue::Int(390)));
        assert_eq!(isupport.int("MAXTARGETS"), Some(4));
    }

    #[test]
    fn bare_numeric_keys_are_never_flags() {
        let mut isupport = Isupport::new();
        isupport.apply_tokens(["MAXTARGETS=4", "NICKLEN=30"]);
        isupport.apply_tokens(["MAXTARGETS", "NICKLEN", "AWAYLEN="]);
        assert_eq!(isupport.int("MAXTARGETS"), None);
        assert!(!isupport.is_set("MAXTARGETS"));
        assert!(!isupport.is_set("AWAYLEN"));
        assert_eq!(isupport.nicklen(), 9);
        assert_eq!(isupport.get("NICKLEN"), Some(&IsupportValue::Int(9)));
    }

    #[test]
    fn bad_tokens_are_skipped() {
        let mut isupport = Isupport::new();
        assert!(isupport.apply_token("NICKLEN=lots").is_err());
        assert!(isupport.apply_token("PREFIX=garbage").is_err());
        assert!(isupport.apply_token("CASEMAPPING=rfc7613").is_err());
        isupport.apply_tokens(["NICKLEN=lots", "TOPICLEN=307"]);
        assert_eq!(isupport.nicklen(), 9);
        assert_eq!(isupport.int("TOPICLEN"), Some(307));
    }

    #[test]
    fn negation_restores_default() {
        let mut isupport = Isupport::new();
        isupport.apply_tokens(["NICKLEN=30", "EXCEPTS"]);
        isupport.apply_tokens(["-NICKLEN", "-EXCEPTS"]);
        assert_eq!(isupport.nicklen(), 9);
        assert!(!isupport.is_set("EXCEPTS"));
    }

    #[test]
    fn channel_detection_and_casemapping() {
        let mut isupport = Isupport::new();
        assert!(isupport.is_channel("#rust"));
        assert!(!isupport.is_channel("mk"));
        isupport.apply_tokens(["CHANTYPES=#", "CASEMAPPING=ascii"]);
        assert!(!isupport.is_channel("&local"));
        assert_eq!(isupport.casemapping(), CaseMapping::Ascii);
    }

    #[test]
    fn mode_arguments() {
        let mut isupport = Isupport::new();
        isupport.apply_tokens(["CHANMODES=beI,k,l,imnpst", "PREFIX=(qaohv)~&@%+"]);
        assert!(isupport.mode_takes_arg('q', Sign::Minus));
        assert!(isupport.mode_takes_arg('b', Sign::Plus));
        assert!(isupport.mode_takes_arg('k', Sign::Minus));
        assert!(isupport.mode_takes_arg('l', Sign::Plus));
        assert!(!isupport.mode_takes_arg('l', Sign::Minus));
        assert!(!isupport.mode_takes_arg('n', Sign::Plus));
    }
}
