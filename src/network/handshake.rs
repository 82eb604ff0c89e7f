//! Capability negotiation, SASL and registration.

use tracing::{debug, info, warn};

use crate::caps::{CapReply, CapSubCommand, Capability, DEFAULT_CAPABILITIES};
use crate::error::HandlerError;
use crate::event::Event;
use crate::message::Message;
use crate::sasl::{chunk_response, encode_plain, SaslMechanism};

use super::{Network, SessionState};

impl Network {
    pub(super) fn on_cap(&mut self, msg: &Message) -> Result<(), HandlerError> {
        let Some(reply) = CapReply::from_message(msg) else {
            return Err(HandlerError::NotEnoughParams {
                command: msg.command.clone(),
                expected: 3,
                got: msg.params.len(),
            });
        };

        match reply.subcommand {
            CapSubCommand::Ls => {
                self.ls_buffer.extend(reply.caps);
                if reply.more {
                    return Ok(());
                }
                self.server_caps = std::mem::take(&mut self.ls_buffer);
                self.emit(Event::NetworkCapabilities {
                    network: self.id.clone(),
                    capabilities: self.server_caps.clone(),
                });
                if !self.waiting_for_cap {
                    return Ok(());
                }

                let wanted = self.wanted_capabilities();
                let request: Vec<&str> = wanted
                    .iter()
                    .map(String::as_str)
                    .filter(|cap| self.server_caps.iter().any(|c| c == cap))
                    .collect();
                if request.is_empty() {
                    self.end_negotiation();
                } else {
                    let request = request.join(" ");
                    debug!(network = %self.id, caps = %request, "requesting capabilities");
                    self.transmit("CAP", &["REQ", &request]);
                }
            }
            CapSubCommand::Ack => {
                for cap in &reply.caps {
                    match cap.strip_prefix('-') {
                        Some(removed) => {
                            self.enabled_caps.remove(removed);
                        }
                        None => {
                            self.enabled_caps.insert(cap.clone());
                        }
                    }
                }
                if reply.contains(&Capability::Sasl) && self.sasl_enabled() {
                    self.state = SessionState::Authenticating;
                    self.transmit("AUTHENTICATE", &[SaslMechanism::Plain.as_str()]);
                } else if self.waiting_for_cap {
                    self.end_negotiation();
                }
            }
            CapSubCommand::Nak => {
                if reply.contains(&Capability::Sasl) && self.sasl_enabled() {
                    warn!(network = %self.id, "server refused SASL but it is configured, disconnecting");
                    self.auth_failed = true;
                    self.close("SASL not supported", false);
                } else if self.waiting_for_cap {
                    self.end_negotiation();
                }
            }
            CapSubCommand::New => {
                for cap in reply.caps {
                    if !self.server_caps.contains(&cap) {
                        self.server_caps.push(cap);
                    }
                }
            }
            CapSubCommand::Del => {
                self.server_caps.retain(|c| !reply.caps.contains(c));
                for cap in &reply.caps {
                    self.enabled_caps.remove(cap);
                }
            }
            CapSubCommand::List => {}
        }
        Ok(())
    }

    fn wanted_capabilities(&self) -> Vec<String> {
        let mut wanted = Vec::new();
        if self.sasl_enabled() {
            wanted.push(Capability::Sasl.to_string());
        }
        wanted.extend(DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()));
        for extra in &self.config.capabilities {
            if !wanted.contains(extra) {
                wanted.push(extra.clone());
            }
        }
        wanted
    }

    /// Send `CAP END` and let registration complete.
    pub(super) fn end_negotiation(&mut self) {
        self.waiting_for_cap = false;
        if self.state != SessionState::Registered {
            self.state = SessionState::Registering;
        }
        self.transmit("CAP", &["END"]);
    }

    pub(super) fn on_authenticate(&mut self, msg: &Message) -> Result<(), HandlerError> {
        if self.auth_failed || msg.param(0) != Some("+") {
            return Ok(());
        }
        let Some(sasl) = self.config.sasl.clone() else {
            return Ok(());
        };
        let payload = encode_plain(&sasl.username, &sasl.password);
        for chunk in chunk_response(&payload) {
            self.transmit("AUTHENTICATE", &[chunk]);
        }
        Ok(())
    }

    pub(super) fn on_logged_in(&mut self, msg: &Message) -> Result<(), HandlerError> {
        info!(network = %self.id, account = msg.param(2).unwrap_or(""), "SASL login succeeded");
        if self.waiting_for_cap {
            self.end_negotiation();
        }
        Ok(())
    }

    pub(super) fn on_sasl_failed(&mut self, msg: &Message) -> Result<(), HandlerError> {
        warn!(
            network = %self.id,
            reason = msg.params.last().map(String::as_str).unwrap_or(""),
            "SASL authentication failed, disconnecting"
        );
        self.auth_failed = true;
        self.waiting_for_cap = false;
        self.close("SASL authentication failed", false);
        Ok(())
    }

    pub(super) fn on_welcome(&mut self, msg: &Message) -> Result<(), HandlerError> {
        if self.waiting_for_cap {
            debug!(network = %self.id, "welcome before negotiation finished, skipping CAP END");
            self.waiting_for_cap = false;
        }
        self.state = SessionState::Registered;
        if let Some(nick) = msg.param(0) {
            self.nickname = nick.to_owned();
        }
        info!(network = %self.id, nick = %self.nickname, "registered");
        self.mark_ready();
        Ok(())
    }

    pub(super) fn on_end_of_motd(&mut self, _msg: &Message) -> Result<(), HandlerError> {
        self.mark_ready();
        Ok(())
    }

    fn mark_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.emit(Event::ConnectionReady {
            network: self.id.clone(),
        });
        let channels: Vec<String> = self.config.channel_names().map(str::to_owned).collect();
        for channel in channels {
            self.join(&channel);
        }
    }

    pub(super) fn on_nickname_in_use(&mut self, msg: &Message) -> Result<(), HandlerError> {
        if self.state == SessionState::Registered {
            debug!(network = %self.id, nick = msg.param(1).unwrap_or(""), "nickname in use");
            return Ok(());
        }
        self.desired_nick.push('_');
        self.nickname = self.desired_nick.clone();
        let nick = self.desired_nick.clone();
        self.transmit("NICK", &[&nick]);
        Ok(())
    }
}
