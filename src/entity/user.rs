use std::collections::BTreeSet;

use crate::mode::{merge_modes, ModeChange};

use super::{ChannelId, UserId};

/// A remote participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub(crate) id: UserId,
    /// Current nickname, renamed in place on NICK.
    pub nick: String,
    /// Username (ident), empty until seen in a prefix.
    pub username: String,
    /// Hostname, empty until seen in a prefix.
    pub hostname: String,
    /// Accumulated status and user modes.
    pub modes: String,
    pub(crate) channels: BTreeSet<ChannelId>,
}

impl User {
    pub(crate) fn new(id: UserId, nick: &str) -> Self {
        User {
            id,
            nick: nick.to_owned(),
            username: String::new(),
            hostname: String::new(),
            modes: String::new(),
            channels: BTreeSet::new(),
        }
    }

    /// This user's key.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Channels this user currently occupies.
    pub fn channels(&self) -> &BTreeSet<ChannelId> {
        &self.channels
    }

    /// Fold mode changes into [`User::modes`].
    pub fn merge_modes(&mut self, changes: &[ModeChange]) {
        merge_modes(&mut self.modes, changes);
    }

    /// `+o`
    pub fn is_operator(&self) -> bool {
        self.modes.contains('o')
    }

    /// `+v`
    pub fn has_voice(&self) -> bool {
        self.modes.contains('v')
    }

    /// `+q`
    pub fn is_owner(&self) -> bool {
        self.modes.contains('q')
    }

    /// `+h`
    pub fn is_half_operator(&self) -> bool {
        self.modes.contains('h')
    }

    /// `+a`
    pub fn is_admin(&self) -> bool {
        self.modes.contains('a')
    }
}
