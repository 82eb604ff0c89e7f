//! Users, channels and the membership relation between them.
//!
//! A [`Roster`] owns every [`User`] and [`Channel`] a session knows
//! about. Records refer to each other by id, never by reference, and the
//! roster keeps `User::channels` and `Channel::users` in agreement.

mod channel;
mod roster;
mod user;

use std::fmt;

pub use self::channel::Channel;
pub use self::roster::Roster;
pub use self::user::User;

/// Key of a [`User`] within its roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(u64);

/// Key of a [`Channel`] within its roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}
