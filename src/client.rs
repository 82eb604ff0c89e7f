//! Multi-network client.
//!
//! A [`Client`] runs one task per network. Each task owns its
//! [`Network`] session and [`Connection`], feeds inbound lines to the
//! session in wire order, carries out the resulting actions, and
//! reconnects with exponential backoff when the connection drops.
//!
//! ```no_run
//! use slirc_client::{Client, Event, EventBus, EventKind};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let bus = EventBus::new();
//! bus.on(EventKind::Message, |event| {
//!     if let Event::Message { user, channel, text, .. } = event {
//!         println!("{} <{}> {}", channel.name, user.nick, text);
//!     }
//!     Ok(())
//! });
//! let client = Client::from_config_file("slirc.toml", bus)?;
//! client.wait().await;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::bus::EventBus;
use crate::config::{Config, NetworkConfig};
use crate::connection::{Connection, ConnectionEvent};
use crate::error::ConfigError;
use crate::event::Event;
use crate::message::Message;
use crate::network::{Network, NetworkAction, SessionState};

enum Control {
    Transmit(Message),
    Quit(Option<String>),
}

/// Cheap handle for sending to one network from any task.
#[derive(Clone, Debug)]
pub struct NetworkHandle {
    id: String,
    control: mpsc::Sender<Control>,
}

impl NetworkHandle {
    /// The network id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a command. Returns `false` if the queue is full or the
    /// network task has stopped. Lines sent while disconnected are
    /// dropped.
    pub fn transmit(&self, command: &str, params: &[&str]) -> bool {
        self.send(Control::Transmit(Message::new(command, params.iter().copied())))
    }

    /// Send a PRIVMSG.
    pub fn say(&self, target: &str, text: &str) -> bool {
        self.transmit("PRIVMSG", &[target, text])
    }

    /// Join a channel.
    pub fn join(&self, channel: &str) -> bool {
        self.transmit("JOIN", &[channel])
    }

    /// Quit this network for good.
    pub fn quit(&self, reason: Option<&str>) -> bool {
        self.send(Control::Quit(reason.map(str::to_owned)))
    }

    fn send(&self, control: Control) -> bool {
        match self.control.try_send(control) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(network = %self.id, "control queue full, dropping command");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Owns every network task and the shared event bus.
#[derive(Debug)]
pub struct Client {
    bus: EventBus,
    networks: Vec<NetworkHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl Client {
    /// A client with no networks yet.
    pub fn new(bus: EventBus) -> Self {
        Client {
            bus,
            networks: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Load a configuration file and start every network in it. Publishes
    /// `config_load` once all networks are started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config_file<P: AsRef<Path>>(path: P, bus: EventBus) -> Result<Self, ConfigError> {
        let config = Config::load(path)?;
        let client = Self::from_config(config, bus)?;
        client.emit(Event::ConfigLoad);
        Ok(client)
    }

    /// Start every network in `config`. Fails before anything is started
    /// if any network is misconfigured.
    pub fn from_config(config: Config, bus: EventBus) -> Result<Self, ConfigError> {
        let sessions = config
            .networks
            .into_iter()
            .map(Network::new)
            .collect::<Result<Vec<_>, _>>()?;
        let mut client = Client::new(bus);
        for session in sessions {
            client.start(session);
        }
        Ok(client)
    }

    /// Start one more network.
    pub fn add_network(&mut self, config: NetworkConfig) -> Result<NetworkHandle, ConfigError> {
        let session = Network::new(config)?;
        Ok(self.start(session))
    }

    fn start(&mut self, session: Network) -> NetworkHandle {
        let id = session.id().to_owned();
        let capacity = session.config().send_queue_capacity.max(1);
        let (control_tx, control_rx) = mpsc::channel(capacity);
        let span = info_span!("network", id = %id);
        let task = tokio::spawn(run_network(session, self.bus.clone(), control_rx).instrument(span));

        let handle = NetworkHandle {
            id,
            control: control_tx,
        };
        self.networks.push(handle.clone());
        self.tasks.push(task);
        handle
    }

    /// The shared event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Publish an event on the bus, e.g. `scripts_loaded` from a script
    /// host.
    pub fn emit(&self, event: Event) {
        self.bus.emit(event);
    }

    /// Handles for every network.
    pub fn networks(&self) -> &[NetworkHandle] {
        &self.networks
    }

    /// Handle for the network with this id.
    pub fn network(&self, id: &str) -> Option<&NetworkHandle> {
        self.networks.iter().find(|n| n.id == id)
    }

    /// Send `QUIT` on every network and close without reconnecting.
    pub fn quit(&self, reason: Option<&str>) {
        for network in &self.networks {
            network.quit(reason);
        }
    }

    /// Wait for every network task to finish.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "network task failed");
            }
        }
    }
}

/// Now, on the runtime clock.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn run_network(mut network: Network, bus: EventBus, mut control: mpsc::Receiver<Control>) {
    let mut attempt: u32 = 0;
    loop {
        match Connection::connect(network.config()).await {
            Ok((connection, events)) => {
                if drive(&mut network, &bus, connection, events, &mut control).await {
                    attempt = 0;
                }
            }
            Err(e) => warn!(error = %e, "connect failed"),
        }

        if !network.should_reconnect() {
            info!("not reconnecting");
            return;
        }
        let delay = network.config().reconnect_backoff(attempt);
        attempt = attempt.saturating_add(1);
        info!(delay_secs = delay.as_secs(), attempt, "reconnecting");

        let deadline = tokio::time::Instant::now() + delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                ctl = control.recv() => match ctl {
                    Some(Control::Transmit(msg)) => {
                        debug!(command = %msg.command, "not connected, dropping line");
                    }
                    Some(Control::Quit(_)) | None => return,
                },
            }
        }
    }
}

/// Run one connection to completion. Returns whether the session
/// registered.
async fn drive(
    network: &mut Network,
    bus: &EventBus,
    connection: Connection,
    mut events: mpsc::Receiver<ConnectionEvent>,
    control: &mut mpsc::Receiver<Control>,
) -> bool {
    let mut registered = false;
    let mut control_open = true;

    let actions = network.connected(now());
    apply(bus, &connection, actions);

    loop {
        let wakeup = network.next_wakeup();
        tokio::select! {
            event = events.recv() => match event {
                Some(ConnectionEvent::LineReceived(msg)) => {
                    let actions = network.feed(&msg, now());
                    apply(bus, &connection, actions);
                    registered |= network.state() == SessionState::Registered;
                }
                Some(ConnectionEvent::Disconnected(reason)) => {
                    debug!(%reason, "transport closed");
                    break;
                }
                None => break,
            },
            _ = sleep_until(wakeup) => {
                let actions = network.poll_keepalive(now());
                apply(bus, &connection, actions);
            }
            ctl = control.recv(), if control_open => match ctl {
                Some(Control::Transmit(msg)) => {
                    connection.send(msg);
                }
                Some(Control::Quit(reason)) => {
                    network.quit(reason.as_deref());
                    apply(bus, &connection, network.take_actions());
                    connection.close();
                }
                None => {
                    // Every handle is gone; nobody can reach this network.
                    control_open = false;
                    network.quit(None);
                    apply(bus, &connection, network.take_actions());
                    connection.close();
                }
            },
        }
    }

    for action in network.disconnected() {
        if let NetworkAction::Emit(event) = action {
            bus.emit(event);
        }
    }
    registered
}

fn apply(bus: &EventBus, connection: &Connection, actions: Vec<NetworkAction>) {
    for action in actions {
        match action {
            NetworkAction::Send(msg) => {
                connection.send(*msg);
            }
            NetworkAction::Emit(event) => bus.emit(event),
            NetworkAction::Close {
                reason,
                reconnect,
                force,
            } => {
                info!(%reason, reconnect, force, "closing connection");
                if force {
                    connection.abort(reason);
                } else {
                    connection.close();
                }
            }
        }
    }
}
