use std::collections::BTreeSet;

use crate::mode::{merge_modes, ModeChange};

use super::{ChannelId, UserId};

/// A channel the session has seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub(crate) id: ChannelId,
    /// Channel name as first seen.
    pub name: String,
    /// Current topic, if known.
    pub topic: Option<String>,
    /// Accumulated channel modes.
    pub modes: String,
    pub(crate) users: BTreeSet<UserId>,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, name: &str) -> Self {
        Channel {
            id,
            name: name.to_owned(),
            topic: None,
            modes: String::new(),
            users: BTreeSet::new(),
        }
    }

    /// This channel's key.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Users currently present.
    pub fn users(&self) -> &BTreeSet<UserId> {
        &self.users
    }

    /// Fold mode changes into [`Channel::modes`].
    pub fn merge_modes(&mut self, changes: &[ModeChange]) {
        merge_modes(&mut self.modes, changes);
    }
}
