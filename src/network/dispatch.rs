//! Routing of inbound messages to handlers, and the handlers that keep
//! the roster in step with the server.

use std::time::Instant;

use tracing::{error, trace, warn};

use crate::entity::{ChannelId, UserId};
use crate::error::HandlerError;
use crate::event::{Event, UserInfo};
use crate::mode::{merge_modes, parse_modes, parse_user_modes, ModeChange};
use crate::message::Message;
use crate::prefix::Prefix;

use super::Network;

/// Every command the session reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Handler {
    Welcome,
    Isupport,
    Topic,
    TopicReply,
    NamesReply,
    EndOfMotd,
    NicknameInUse,
    LoggedIn,
    SaslSuccess,
    SaslFailed,
    Cap,
    Authenticate,
    Ping,
    Pong,
    Privmsg,
    Join,
    Part,
    Quit,
    Kick,
    Nick,
    Mode,
    Error,
    Unknown,
}

impl Handler {
    /// Resolve a command token. Matching ignores ASCII case.
    pub(crate) fn resolve(command: &str) -> Handler {
        match command.to_ascii_uppercase().as_str() {
            "001" => Handler::Welcome,
            "005" => Handler::Isupport,
            "332" => Handler::TopicReply,
            "353" => Handler::NamesReply,
            "376" | "422" => Handler::EndOfMotd,
            "433" => Handler::NicknameInUse,
            "900" => Handler::LoggedIn,
            "903" => Handler::SaslSuccess,
            "904" => Handler::SaslFailed,
            "CAP" => Handler::Cap,
            "AUTHENTICATE" => Handler::Authenticate,
            "PING" => Handler::Ping,
            "PONG" => Handler::Pong,
            "PRIVMSG" => Handler::Privmsg,
            "JOIN" => Handler::Join,
            "PART" => Handler::Part,
            "QUIT" => Handler::Quit,
            "KICK" => Handler::Kick,
            "NICK" => Handler::Nick,
            "MODE" => Handler::Mode,
            "TOPIC" => Handler::Topic,
            "ERROR" => Handler::Error,
            _ => Handler::Unknown,
        }
    }
}

fn require(msg: &Message, expected: usize) -> Result<(), HandlerError> {
    if msg.params.len() < expected {
        return Err(HandlerError::NotEnoughParams {
            command: msg.command.clone(),
            expected,
            got: msg.params.len(),
        });
    }
    Ok(())
}

fn source(msg: &Message) -> Result<(&str, &str, &str), HandlerError> {
    match msg.prefix {
        Some(Prefix::Nickname(ref nick, ref user, ref host)) if !nick.is_empty() => {
            Ok((nick.as_str(), user.as_str(), host.as_str()))
        }
        _ => Err(HandlerError::NoSource(msg.command.clone())),
    }
}

impl Network {
    pub(super) fn dispatch(&mut self, msg: &Message, now: Instant) {
        let handler = Handler::resolve(&msg.command);
        let result = match handler {
            Handler::Welcome => self.on_welcome(msg),
            Handler::Isupport => self.on_isupport(msg),
            Handler::Topic => self.on_topic(msg),
            Handler::TopicReply => self.on_topic_reply(msg),
            Handler::NamesReply => self.on_names_reply(msg),
            Handler::EndOfMotd => self.on_end_of_motd(msg),
            Handler::NicknameInUse => self.on_nickname_in_use(msg),
            Handler::LoggedIn | Handler::SaslSuccess => self.on_logged_in(msg),
            Handler::SaslFailed => self.on_sasl_failed(msg),
            Handler::Cap => self.on_cap(msg),
            Handler::Authenticate => self.on_authenticate(msg),
            Handler::Ping => self.on_ping(msg, now),
            Handler::Pong => self.on_pong(msg, now),
            Handler::Privmsg => self.on_privmsg(msg),
            Handler::Join => self.on_join(msg),
            Handler::Part => self.on_part(msg),
            Handler::Quit => self.on_quit(msg),
            Handler::Kick => self.on_kick(msg),
            Handler::Nick => self.on_nick(msg),
            Handler::Mode => self.on_mode(msg),
            Handler::Error => {
                warn!(network = %self.id, reason = msg.param(0).unwrap_or(""), "server error");
                Ok(())
            }
            Handler::Unknown => {
                trace!(command = %msg.command, "unhandled command");
                Ok(())
            }
        };
        if let Err(e) = result {
            error!(network = %self.id, handler = ?handler, error = %e, "handler failed");
        }
    }

    fn on_ping(&mut self, msg: &Message, now: Instant) -> Result<(), HandlerError> {
        let token = msg.param(0).unwrap_or("").to_owned();
        self.keepalive.seen(now);
        self.transmit("PONG", &[&token]);
        self.emit(Event::NetworkPing {
            network: self.id.clone(),
            token,
        });
        Ok(())
    }

    fn on_pong(&mut self, msg: &Message, now: Instant) -> Result<(), HandlerError> {
        self.keepalive.seen(now);
        self.emit(Event::NetworkPong {
            network: self.id.clone(),
            token: msg.params.last().cloned(),
        });
        Ok(())
    }

    fn on_isupport(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 2)?;
        // Skip our nick and, when present, the trailing human text.
        let end = if msg.params.len() > 2 {
            msg.params.len() - 1
        } else {
            msg.params.len()
        };
        self.isupport
            .apply_tokens(msg.params[1..end].iter().map(String::as_str));
        self.roster.set_casemapping(self.isupport.casemapping());
        Ok(())
    }

    /// Find or create a channel, emitting `channel_created` only the first
    /// time a name is seen.
    fn channel_for(&mut self, name: &str) -> ChannelId {
        let (id, created) = self.roster.find_or_create_channel(name);
        if created {
            self.emit(Event::ChannelCreated {
                network: self.id.clone(),
                channel: self.channel_info(id),
            });
        }
        id
    }

    /// Find or create a user, emitting `user_created` only the first time
    /// a nickname is seen.
    fn user_for(&mut self, nick: &str) -> UserId {
        let (id, created) = self.roster.find_or_create_user(nick);
        if created {
            self.emit(Event::UserCreated {
                network: self.id.clone(),
                user: self.user_info(id),
            });
        }
        id
    }

    fn update_host(&mut self, id: UserId, username: &str, hostname: &str) {
        if let Some(user) = self.roster.user_mut(id) {
            if !username.is_empty() {
                user.username = username.to_owned();
            }
            if !hostname.is_empty() {
                user.hostname = hostname.to_owned();
            }
        }
    }

    fn on_names_reply(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 4)?;
        let channel = self.channel_for(&msg.params[2]);
        let prefixes = self.isupport.prefix();

        for entry in msg.params[3].split_whitespace() {
            let (modes, rest) = prefixes.strip(entry);
            let (nick, username, hostname) = match Prefix::new_from_str(rest) {
                Prefix::Nickname(n, u, h) => (n, u, h),
                Prefix::ServerName(n) => (n, String::new(), String::new()),
            };
            if nick.is_empty() {
                continue;
            }
            let user = self.user_for(&nick);
            self.update_host(user, &username, &hostname);
            if let Some(record) = self.roster.user_mut(user) {
                for mode in modes.chars() {
                    if !record.modes.contains(mode) {
                        record.modes.push(mode);
                    }
                }
            }
            self.roster.join(user, channel);
        }

        self.emit(Event::ChannelWhoReply {
            network: self.id.clone(),
            channel: self.channel_info(channel),
        });
        Ok(())
    }

    fn set_topic(&mut self, name: &str, topic: &str, setter: Option<UserInfo>) {
        let channel = self.channel_for(name);
        if let Some(record) = self.roster.channel_mut(channel) {
            record.topic = Some(topic.to_owned());
        }
        self.emit(Event::ChannelTopic {
            network: self.id.clone(),
            channel: self.channel_info(channel),
            topic: topic.to_owned(),
            setter,
        });
    }

    fn on_topic_reply(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 3)?;
        self.set_topic(&msg.params[1], &msg.params[2], None);
        Ok(())
    }

    fn on_topic(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 2)?;
        let setter = source(msg).ok().map(|(nick, user, host)| {
            match self.roster.find_user(nick) {
                Some(id) => self.user_info(id),
                None => UserInfo::transient(nick, user, host),
            }
        });
        self.set_topic(&msg.params[0], &msg.params[1], setter);
        Ok(())
    }

    fn on_privmsg(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 2)?;
        // Server notices and the like carry no nick; nothing to attribute.
        let Ok((nick, username, hostname)) = source(msg) else {
            return Ok(());
        };
        let target = &msg.params[0];
        let text = msg.params[1].clone();

        let user = match self.roster.find_user(nick) {
            Some(id) => {
                self.update_host(id, username, hostname);
                self.user_info(id)
            }
            None => UserInfo::transient(nick, username, hostname),
        };

        match self.roster.find_channel(target) {
            Some(channel) => self.emit(Event::Message {
                network: self.id.clone(),
                user,
                channel: self.channel_info(channel),
                text,
                tags: msg.tags.clone(),
            }),
            None => self.emit(Event::PrivateMessage {
                network: self.id.clone(),
                user,
                text,
                tags: msg.tags.clone(),
            }),
        }
        Ok(())
    }

    fn on_join(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 1)?;
        let (nick, username, hostname) = source(msg)?;
        let user = self.user_for(nick);
        self.update_host(user, username, hostname);
        let channel = self.channel_for(&msg.params[0]);
        self.roster.join(user, channel);
        self.emit(Event::UserEntered {
            network: self.id.clone(),
            channel: self.channel_info(channel),
            user: self.user_info(user),
        });
        Ok(())
    }

    fn on_part(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 1)?;
        let (nick, _, _) = source(msg)?;
        let (Some(channel), Some(user)) = (
            self.roster.find_channel(&msg.params[0]),
            self.roster.find_user(nick),
        ) else {
            return Ok(());
        };

        let user_info = self.user_info(user);
        let mut channel_info = self.channel_info(channel);
        if self.is_me(nick) {
            self.roster.remove_channel(channel);
            channel_info.users.clear();
        } else {
            self.roster.part(user, channel);
            channel_info = self.channel_info(channel);
        }
        self.emit(Event::UserLeft {
            network: self.id.clone(),
            channel: channel_info,
            user: user_info,
            reason: msg.param(1).map(str::to_owned),
        });
        Ok(())
    }

    fn on_quit(&mut self, msg: &Message) -> Result<(), HandlerError> {
        let (nick, _, _) = source(msg)?;
        let Some(user) = self.roster.find_user(nick) else {
            return Ok(());
        };
        let Some(record) = self.roster.remove_user(user) else {
            return Ok(());
        };
        self.emit(Event::UserQuit {
            network: self.id.clone(),
            user: UserInfo::from(&record),
            reason: msg.param(0).map(str::to_owned),
        });
        Ok(())
    }

    fn on_kick(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 2)?;
        let kicker = match msg.prefix {
            Some(ref prefix) => prefix.nick().or_else(|| prefix.host()).unwrap_or("").to_owned(),
            None => String::new(),
        };
        let (Some(channel), Some(kickee)) = (
            self.roster.find_channel(&msg.params[0]),
            self.roster.find_user(&msg.params[1]),
        ) else {
            return Ok(());
        };

        let kickee_info = self.user_info(kickee);
        let mut channel_info = self.channel_info(channel);
        if self.is_me(&msg.params[1]) {
            self.roster.remove_channel(channel);
            channel_info.users.clear();
        } else {
            self.roster.part(kickee, channel);
            channel_info = self.channel_info(channel);
        }
        self.emit(Event::UserKicked {
            network: self.id.clone(),
            kicker,
            channel: channel_info,
            kickee: kickee_info,
            reason: msg.param(2).map(str::to_owned),
        });
        Ok(())
    }

    fn on_nick(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 1)?;
        let (old_nick, _, _) = source(msg)?;
        let new_nick = msg.params[0].clone();

        if self.is_me(old_nick) {
            self.nickname = new_nick.clone();
            self.desired_nick = new_nick.clone();
            self.emit(Event::NickChanged {
                network: self.id.clone(),
                nick: new_nick.clone(),
            });
        }

        if let Some(user) = self.roster.find_user(old_nick) {
            let before = self.user_info(user);
            self.roster.rename(user, &new_nick);
            self.emit(Event::UserRename {
                network: self.id.clone(),
                user: before,
                new_nick,
            });
        }
        Ok(())
    }

    fn on_mode(&mut self, msg: &Message) -> Result<(), HandlerError> {
        require(msg, 2)?;
        let target = msg.params[0].as_str();

        if !self.isupport.is_channel(target) {
            let changes = parse_user_modes(&msg.params[1]);
            if self.is_me(target) {
                merge_modes(&mut self.own_modes, &changes);
            }
            let user = match self.roster.find_user(target) {
                Some(id) => {
                    if let Some(record) = self.roster.user_mut(id) {
                        record.merge_modes(&changes);
                    }
                    self.user_info(id)
                }
                None if self.is_me(target) => UserInfo {
                    nick: self.nickname.clone(),
                    modes: self.own_modes.clone(),
                    ..UserInfo::default()
                },
                None => return Ok(()),
            };
            self.emit(Event::UserMode {
                network: self.id.clone(),
                user,
                modes: changes,
            });
            return Ok(());
        }

        let Some(channel) = self.roster.find_channel(target) else {
            return Ok(());
        };
        let pieces: Vec<&str> = msg.params[1..].iter().map(String::as_str).collect();
        let isupport = &self.isupport;
        let changes = parse_modes(&pieces, |c, sign| isupport.mode_takes_arg(c, sign));

        let prefixes = self.isupport.prefix();
        let list_modes = self.isupport.chanmodes().a;
        let mut channel_changes: Vec<ModeChange> = Vec::new();

        for change in changes {
            if prefixes.is_prefix_mode(change.mode) {
                let Some(user) = change.arg.as_deref().and_then(|n| self.roster.find_user(n)) else {
                    continue;
                };
                let applied = [change];
                if let Some(record) = self.roster.user_mut(user) {
                    record.merge_modes(&applied);
                }
                self.emit(Event::UserMode {
                    network: self.id.clone(),
                    user: self.user_info(user),
                    modes: applied.to_vec(),
                });
            } else {
                channel_changes.push(change);
            }
        }

        if channel_changes.is_empty() {
            return Ok(());
        }
        if let Some(record) = self.roster.channel_mut(channel) {
            // List modes describe masks, not channel state.
            let settings: Vec<&ModeChange> = channel_changes
                .iter()
                .filter(|c| !list_modes.contains(c.mode))
                .collect();
            merge_modes(&mut record.modes, settings);
        }
        self.emit(Event::ChannelMode {
            network: self.id.clone(),
            channel: self.channel_info(channel),
            modes: channel_changes,
        });
        Ok(())
    }
}
