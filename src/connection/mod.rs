//! Transport for one server.
//!
//! A [`Connection`] owns two tasks: a reader that decodes frames and
//! forwards them as [`ConnectionEvent::LineReceived`], and a writer that
//! drains a bounded outbound queue in FIFO order. Callers never block on
//! [`Connection::send`]; a full queue drops the line and counts it.
//!
//! Whatever ends the connection first (peer EOF, a read or write error,
//! [`Connection::close`], [`Connection::abort`], or dropping the handle)
//! produces exactly one [`ConnectionEvent::Disconnected`].

mod endpoint;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::error::{ConnectError, ProtocolError};
use crate::irc::IrcCodec;
use crate::message::Message;

pub use self::endpoint::AsyncStream;

/// Capacity of the inbound event channel.
const EVENT_CAPACITY: usize = 256;

/// How long a graceful close may spend flushing to a peer that is not reading.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport lifecycle.
///
/// A handle only exists once the socket is open, so the connecting phase
/// is the [`Connection::connect`] future itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Read and write loops running.
    Established,
    /// Flushing the outbound queue before shutdown.
    Closing,
}

/// What the transport reports to its owner.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// One decoded frame.
    LineReceived(Message),
    /// The connection is gone. Sent exactly once.
    Disconnected(String),
}

struct Shared {
    id: String,
    state: Mutex<ConnectionState>,
    disconnected: AtomicBool,
    dropped: AtomicU64,
    /// Stops both tasks immediately.
    shutdown: CancellationToken,
    /// Asks the writer to flush and shut down.
    closing: CancellationToken,
    events: mpsc::Sender<ConnectionEvent>,
}

impl Shared {
    /// Stop both loops. Returns `false` if that already happened.
    fn mark_disconnected(&self, reason: &str) -> bool {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.state.lock() = ConnectionState::Disconnected;
        self.shutdown.cancel();
        info!(connection = %self.id, %reason, "connection closed");
        true
    }

    async fn disconnect(&self, reason: String) {
        if self.mark_disconnected(&reason) {
            // The owner may already be gone.
            let _ = self.events.send(ConnectionEvent::Disconnected(reason)).await;
        }
    }
}

/// Handle to a running connection.
pub struct Connection {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<Message>,
}

impl Connection {
    /// Connect to the server described by `config`. On failure the
    /// connection never left `Disconnected` and no event is sent.
    pub async fn connect(
        config: &NetworkConfig,
    ) -> Result<(Connection, mpsc::Receiver<ConnectionEvent>), ConnectError> {
        let id = config.id();
        debug!(connection = %id, secure = config.secure, "connecting");
        let stream = endpoint::open(config).await?;
        Ok(Connection::spawn(id, stream, config.send_queue_capacity))
    }

    /// Run the read and write loops over an already open stream.
    pub fn spawn<S>(
        id: impl Into<String>,
        stream: S,
        queue_capacity: usize,
    ) -> (Connection, mpsc::Receiver<ConnectionEvent>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(queue_capacity.max(1));
        let shared = Arc::new(Shared {
            id: id.into(),
            state: Mutex::new(ConnectionState::Established),
            disconnected: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            closing: CancellationToken::new(),
            events: events_tx,
        });

        let (reader, writer) = tokio::io::split(stream);
        tokio::spawn(read_loop(
            Arc::clone(&shared),
            FramedRead::new(reader, IrcCodec::new()),
        ));
        tokio::spawn(write_loop(
            Arc::clone(&shared),
            FramedWrite::new(writer, IrcCodec::new()),
            outbound_rx,
        ));

        let connection = Connection {
            shared,
            outbound: outbound_tx,
        };
        (connection, events_rx)
    }

    /// Queue a message. Returns `false` if it was not queued, either
    /// because the queue is full or because the connection is gone.
    pub fn send(&self, msg: Message) -> bool {
        match self.outbound.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    connection = %self.shared.id,
                    command = %msg.command,
                    dropped,
                    "send queue full, dropping line"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Flush the outbound queue, then shut the socket down.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if *state == ConnectionState::Established {
            *state = ConnectionState::Closing;
            self.shared.closing.cancel();
        }
    }

    /// Drop the socket now, discarding anything still queued.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.shared.mark_disconnected(&reason) {
            let events = self.shared.events.clone();
            tokio::spawn(async move {
                let _ = events.send(ConnectionEvent::Disconnected(reason)).await;
            });
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Lines dropped because the outbound queue was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Connection id, as given to [`Connection::spawn`].
    pub fn id(&self) -> &str {
        &self.shared.id
    }
}

async fn read_loop<R>(shared: Arc<Shared>, mut framed: FramedRead<R, IrcCodec>)
where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            frame = framed.next() => match frame {
                Some(Ok(msg)) => {
                    if shared.events.send(ConnectionEvent::LineReceived(msg)).await.is_err() {
                        break "owner went away".to_owned();
                    }
                }
                Some(Err(e)) => break format!("read error: {}", e),
                None => break "connection closed by peer".to_owned(),
            },
        }
    };
    shared.disconnect(reason).await;
}

async fn write_loop<W>(
    shared: Arc<Shared>,
    mut framed: FramedWrite<W, IrcCodec>,
    mut outbound: mpsc::Receiver<Message>,
) where
    W: AsyncWrite + Unpin,
{
    let reason = loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => return,
            _ = shared.closing.cancelled() => break "closed locally".to_owned(),
            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    break "connection handle dropped".to_owned();
                };
                // A peer that stops reading must not pin the writer here.
                let sent = tokio::select! {
                    biased;
                    _ = shared.shutdown.cancelled() => return,
                    sent = framed.send(msg) => sent,
                    _ = shared.closing.cancelled() => break "closed locally".to_owned(),
                };
                match sent {
                    Ok(()) => {}
                    Err(ProtocolError::IllegalControlChar(ch)) => {
                        warn!(connection = %shared.id, ?ch, "dropping outbound line with illegal character");
                    }
                    Err(e @ (ProtocolError::InvalidCommand(_) | ProtocolError::InvalidParameter { .. })) => {
                        warn!(connection = %shared.id, error = %e, "dropping outbound line");
                    }
                    Err(e) => break format!("write error: {}", e),
                }
            }
        }
    };

    let finish = async {
        if shared.closing.is_cancelled() {
            while let Ok(msg) = outbound.try_recv() {
                if let Err(e) = framed.feed(msg).await {
                    debug!(connection = %shared.id, error = %e, "dropping line during close");
                }
            }
        }
        // Flushes buffered frames, then shuts the write half down.
        framed.close().await
    };
    tokio::select! {
        biased;
        _ = shared.shutdown.cancelled() => return,
        finished = tokio::time::timeout(CLOSE_TIMEOUT, finish) => match finished {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(connection = %shared.id, error = %e, "error during shutdown"),
            Err(_) => warn!(connection = %shared.id, "peer not reading, abandoning flush"),
        },
    }
    shared.disconnect(reason).await;
}
