//! IRC message codec.
//!
//! [`Message::decode`] turns one wire line into a [`Message`]; its
//! `Display` implementation (and the [`encode`] helper) produce the line
//! back, without the terminator.

mod nom_parser;
mod parse;
mod serialize;
pub mod tags;
mod types;

pub use self::tags::{Tag, Tags};
pub use self::types::{encode, Message, MAX_PARAMS};
