//! Keepalive timers.
//!
//! Time is passed in by the caller, so the same logic runs under a real
//! clock and under a paused test clock.

use std::time::{Duration, Instant};

/// How often the silence threshold is checked.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// How long a PONG may take after we ping.
pub const PONG_TIMEOUT: Duration = Duration::from_secs(15);

/// What the caller should do after polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeepaliveAction {
    /// Nothing is due.
    Idle,
    /// The link has been quiet too long; send a PING.
    SendPing,
    /// Our PING went unanswered; the connection is dead.
    TimedOut,
}

#[derive(Clone, Debug)]
pub(crate) struct Keepalive {
    interval: Duration,
    last_seen: Option<Instant>,
    next_check: Option<Instant>,
    pong_deadline: Option<Instant>,
}

impl Keepalive {
    pub(crate) fn new(interval: Duration) -> Self {
        Keepalive {
            interval,
            last_seen: None,
            next_check: None,
            pong_deadline: None,
        }
    }

    /// Arm the timers for a fresh connection.
    pub(crate) fn start(&mut self, now: Instant) {
        self.last_seen = Some(now);
        self.next_check = Some(now + CHECK_INTERVAL);
        self.pong_deadline = None;
    }

    /// Disarm every timer.
    pub(crate) fn stop(&mut self) {
        self.next_check = None;
        self.pong_deadline = None;
    }

    /// Record PING or PONG traffic. Cancels a pending PONG timeout.
    pub(crate) fn seen(&mut self, now: Instant) {
        self.last_seen = Some(now);
        self.pong_deadline = None;
    }

    pub(crate) fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    /// Earliest instant at which [`Keepalive::poll`] has work to do.
    pub(crate) fn next_wakeup(&self) -> Option<Instant> {
        match (self.next_check, self.pong_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn poll(&mut self, now: Instant) -> KeepaliveAction {
        if let Some(deadline) = self.pong_deadline {
            if now >= deadline {
                self.stop();
                return KeepaliveAction::TimedOut;
            }
        }

        let Some(next_check) = self.next_check else {
            return KeepaliveAction::Idle;
        };
        if now < next_check {
            return KeepaliveAction::Idle;
        }
        self.next_check = Some(now + CHECK_INTERVAL);

        let quiet = self
            .last_seen
            .map_or(Duration::ZERO, |seen| now.saturating_duration_since(seen));
        if quiet >= self.interval && self.pong_deadline.is_none() {
            self.pong_deadline = Some(now + PONG_TIMEOUT);
            return KeepaliveAction::SendPing;
        }
        KeepaliveAction::Idle
    }
}
