use std::collections::HashMap;

use tracing::debug;

use crate::casemap::CaseMapping;

use super::{Channel, ChannelId, User, UserId};

/// Arena of users and channels for one session.
///
/// Lookups by name go through indices keyed by the case-folded name, so
/// `Mk` and `mk` resolve to the same user under every mapping.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    casemapping: CaseMapping,
    next_id: u64,
    users: HashMap<UserId, User>,
    channels: HashMap<ChannelId, Channel>,
    user_index: HashMap<String, UserId>,
    channel_index: HashMap<String, ChannelId>,
}

impl Roster {
    /// An empty roster folding names with `casemapping`.
    pub fn new(casemapping: CaseMapping) -> Self {
        Roster {
            casemapping,
            ..Default::default()
        }
    }

    /// The active case mapping.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemapping
    }

    /// Switch case mapping and rebuild the name indices.
    pub fn set_casemapping(&mut self, casemapping: CaseMapping) {
        if casemapping == self.casemapping {
            return;
        }
        debug!(from = %self.casemapping, to = %casemapping, "re-folding roster");
        self.casemapping = casemapping;
        self.user_index = self
            .users
            .values()
            .map(|u| (casemapping.fold(&u.nick), u.id))
            .collect();
        self.channel_index = self
            .channels
            .values()
            .map(|c| (casemapping.fold(&c.name), c.id))
            .collect();
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Look up a user by nickname.
    pub fn find_user(&self, nick: &str) -> Option<UserId> {
        self.user_index.get(&self.casemapping.fold(nick)).copied()
    }

    /// Look up a channel by name.
    pub fn find_channel(&self, name: &str) -> Option<ChannelId> {
        self.channel_index.get(&self.casemapping.fold(name)).copied()
    }

    /// Return the user called `nick`, creating it if needed. The flag is
    /// true only when the user was created by this call.
    pub fn find_or_create_user(&mut self, nick: &str) -> (UserId, bool) {
        if let Some(id) = self.find_user(nick) {
            return (id, false);
        }
        let id = UserId(self.next_id());
        self.users.insert(id, User::new(id, nick));
        self.user_index.insert(self.casemapping.fold(nick), id);
        (id, true)
    }

    /// Return the channel called `name`, creating it if needed. The flag
    /// is true only when the channel was created by this call.
    pub fn find_or_create_channel(&mut self, name: &str) -> (ChannelId, bool) {
        if let Some(id) = self.find_channel(name) {
            return (id, false);
        }
        let id = ChannelId(self.next_id());
        self.channels.insert(id, Channel::new(id, name));
        self.channel_index.insert(self.casemapping.fold(name), id);
        (id, true)
    }

    /// A user record.
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// A mutable user record. The nickname must be changed through
    /// [`Roster::rename`] so the index follows.
    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    /// A channel record.
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// A mutable channel record.
    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(&id)
    }

    /// Every user.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Every channel.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Number of tracked users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of tracked channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Add membership in both directions. Returns false if it already
    /// existed or either side is unknown.
    pub fn join(&mut self, user: UserId, channel: ChannelId) -> bool {
        let (Some(u), Some(c)) = (self.users.get_mut(&user), self.channels.get_mut(&channel)) else {
            return false;
        };
        let added = u.channels.insert(channel);
        c.users.insert(user);
        added
    }

    /// Remove membership in both directions. Returns the user record if
    /// this left it without any channel, in which case it is dropped.
    pub fn part(&mut self, user: UserId, channel: ChannelId) -> Option<User> {
        if let Some(c) = self.channels.get_mut(&channel) {
            c.users.remove(&user);
        }
        let orphaned = match self.users.get_mut(&user) {
            Some(u) => {
                u.channels.remove(&channel);
                u.channels.is_empty()
            }
            None => false,
        };
        if orphaned {
            self.drop_user(user)
        } else {
            None
        }
    }

    /// Remove a user from every channel and from the roster.
    pub fn remove_user(&mut self, user: UserId) -> Option<User> {
        let record = self.drop_user(user)?;
        for channel in &record.channels {
            if let Some(c) = self.channels.get_mut(channel) {
                c.users.remove(&user);
            }
        }
        Some(record)
    }

    fn drop_user(&mut self, user: UserId) -> Option<User> {
        let record = self.users.remove(&user)?;
        let key = self.casemapping.fold(&record.nick);
        if self.user_index.get(&key) == Some(&user) {
            self.user_index.remove(&key);
        }
        Some(record)
    }

    /// Remove a channel, parting every member. Members left without a
    /// channel are dropped and returned.
    pub fn remove_channel(&mut self, channel: ChannelId) -> Vec<User> {
        let Some(record) = self.channels.remove(&channel) else {
            return Vec::new();
        };
        self.channel_index.remove(&self.casemapping.fold(&record.name));
        let mut dropped = Vec::new();
        for user in record.users {
            let orphaned = match self.users.get_mut(&user) {
                Some(u) => {
                    u.channels.remove(&channel);
                    u.channels.is_empty()
                }
                None => false,
            };
            if orphaned {
                dropped.extend(self.drop_user(user));
            }
        }
        dropped
    }

    /// Rename a user in place and re-key the index. A different user
    /// already holding `new_nick` is stale and gets removed.
    pub fn rename(&mut self, user: UserId, new_nick: &str) -> bool {
        let new_key = self.casemapping.fold(new_nick);
        if let Some(&holder) = self.user_index.get(&new_key) {
            if holder != user {
                debug!(nick = new_nick, "dropping stale user record on rename");
                self.remove_user(holder);
            }
        }
        let Some(record) = self.users.get_mut(&user) else {
            return false;
        };
        let old_key = self.casemapping.fold(&record.nick);
        record.nick = new_nick.to_owned();
        self.user_index.remove(&old_key);
        self.user_index.insert(new_key, user);
        true
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.users.clear();
        self.channels.clear();
        self.user_index.clear();
        self.channel_index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric(roster: &Roster) -> bool {
        roster.users().all(|u| {
            u.channels()
                .iter()
                .all(|c| roster.channel(*c).is_some_and(|c| c.users().contains(&u.id())))
        }) && roster.channels().all(|c| {
            c.users()
                .iter()
                .all(|u| roster.user(*u).is_some_and(|u| u.channels().contains(&c.id())))
        })
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let mut roster = Roster::new(CaseMapping::Rfc1459);
        let (a, created) = roster.find_or_create_channel("#Rust");
        assert!(created);
        let (b, created) = roster.find_or_create_channel("#rust");
        assert!(!created);
        assert_eq!(a, b);
        assert_eq!(roster.channel_count(), 1);

        let (u1, created) = roster.find_or_create_user("Nick[1]");
        assert!(created);
        let (u2, created) = roster.find_or_create_user("nick{1}");
        assert!(!created);
        assert_eq!(u1, u2);
    }

    #[test]
    fn part_last_channel_collects_user() {
        let mut roster = Roster::new(CaseMapping::Rfc1459);
        let (mk, _) = roster.find_or_create_user("mk");
        let (a, _) = roster.find_or_create_channel("#a");
        let (b, _) = roster.find_or_create_channel("#b");
        roster.join(mk, a);
        roster.join(mk, b);

        assert!(roster.part(mk, a).is_none());
        assert!(roster.find_user("mk").is_some());
        assert!(symmetric(&roster));

        let dropped = roster.part(mk, b).unwrap();
        assert_eq!(dropped.nick, "mk");
        assert!(roster.find_user("mk").is_none());
        assert!(symmetric(&roster));
    }

    #[test]
    fn remove_user_clears_memberships() {
        let mut roster = Roster::new(CaseMapping::Rfc1459);
        let (mk, _) = roster.find_or_create_user("mk");
        let (a, _) = roster.find_or_create_channel("#a");
        roster.join(mk, a);
        roster.remove_user(mk);
        assert!(roster.channel(a).unwrap().users().is_empty());
        assert_eq!(roster.user_count(), 0);
    }

    #[test]
    fn remove_channel_collects_orphans() {
        let mut roster = Roster::new(CaseMapping::Rfc1459);
        let (mk, _) = roster.find_or_create_user("mk");
        let (jo, _) = roster.find_or_create_user("jo");
        let (a, _) = roster.find_or_create_channel("#a");
        let (b, _) = roster.find_or_create_channel("#b");
        roster.join(mk, a);
        roster.join(jo, a);
        roster.join(jo, b);

        let dropped = roster.remove_channel(a);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].nick, "mk");
        assert!(roster.find_channel("#a").is_none());
        assert!(roster.find_user("jo").is_some());
        assert!(symmetric(&roster));
    }

    #[test]
    fn rename_rekeys_index() {
        let mut roster = Roster::new(CaseMapping::Rfc1459);
        let (mk, _) = roster.find_or_create_user("mk");
        assert!(roster.rename(mk, "Mk_away"));
        assert_eq!(roster.find_user("mk_AWAY"), Some(mk));
        assert!(roster.find_user("mk").is_none());
        assert_eq!(roster.user(mk).unwrap().nick, "Mk_away");
    }

    #[test]
    fn casemapping_change_refolds() {
        let mut roster = Roster::new(CaseMapping::Ascii);
        let (id, _) = roster.find_or_create_user("a[b]");
        assert!(roster.find_user("a{b}").is_none());
        roster.set_casemapping(CaseMapping::Rfc1459);
        assert_eq!(roster.find_user("A{B}"), Some(id));
    }
}
