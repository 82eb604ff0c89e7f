//! Process-wide event bus.
//!
//! Every network publishes into one [`EventBus`]. Consumers either
//! register a callback for an [`EventKind`] with [`EventBus::on`] or take
//! a broadcast receiver with [`EventBus::subscribe`]. A failing callback
//! is logged and does not stop delivery to the rest.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{error, trace};

use crate::event::{Event, EventKind};

/// Broadcast capacity. Slow subscribers past this lag and skip events.
const BROADCAST_CAPACITY: usize = 1024;

type Callback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Shared event bus. Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

struct Inner {
    sender: broadcast::Sender<Event>,
    callbacks: RwLock<HashMap<EventKind, Vec<Callback>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.inner.sender.receiver_count())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// An empty bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        EventBus {
            inner: Arc::new(Inner {
                sender,
                callbacks: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Call `callback` for every event of `kind`, in registration order.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .write()
            .entry(kind)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.sender.subscribe()
    }

    /// Publish an event. Safe to call from any task.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        trace!(event = %kind, network = event.network().unwrap_or("-"), "emit");

        // Callbacks may register further callbacks, so run them unlocked.
        let callbacks: Vec<Callback> = self
            .inner
            .callbacks
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            if let Err(e) = callback(&event) {
                error!(event = %kind, error = %e, "event callback failed");
            }
        }

        // No receivers is fine.
        let _ = self.inner.sender.send(event);
    }
}
