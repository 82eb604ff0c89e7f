//! IRCv3 message tags.

use std::fmt::{self, Result as FmtResult, Write};

/// A single message tag: key and optional value.
///
/// A `None` value is a bare flag tag (`@key`); `Some("")` is written as
/// `@key=`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub String, pub Option<String>);

/// Ordered collection of message tags.
///
/// Order is preserved so that a decoded line re-encodes byte for byte.
/// An untagged message carries an empty collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(Vec<Tag>);

impl Tags {
    /// An empty tag collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Decode the raw wire form (without the leading `@`).
    pub fn parse(raw: &str) -> Self {
        raw.split(';')
            .filter(|s| !s.is_empty())
            .map(|s| match s.split_once('=') {
                Some((k, v)) => Tag(k.to_owned(), Some(unescape_tag_value(v))),
                None => Tag(s.to_owned(), None),
            })
            .collect()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no tags are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a tag with this key is present, with or without a value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|Tag(k, _)| k == key)
    }

    /// The value of a tag. Flag tags and `key=` both yield `Some("")`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|Tag(k, _)| k == key)
            .map(|Tag(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Set a tag, replacing an existing one with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.0.iter_mut().find(|Tag(k, _)| *k == key) {
            Some(tag) => tag.1 = value,
            None => self.0.push(Tag(key, value)),
        }
    }

    /// Iterate over tags in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, Tag(key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(';')?;
            }
            f.write_str(key)?;
            if let Some(value) = value {
                f.write_char('=')?;
                escape_tag_value(f, value)?;
            }
        }
        Ok(())
    }
}

/// Escape a tag value for serialization.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Unescape a tag value from wire format.
pub(crate) fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}
