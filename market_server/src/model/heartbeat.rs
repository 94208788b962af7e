//! Keep-alive state tracker for WebSocket clients.
//!
//! Each connection owns a `Heartbeat` that remembers when the peer was last heard from
//! and when the server last pinged it. The connection loop calls
//! [`Heartbeat::poll`] on every pass and acts on the returned [`HeartbeatAction`]:
//!
//! - `SendPing`: the ping interval elapsed; send a WebSocket ping.
//! - `Expired`: nothing arrived within the timeout; drop the connection.
//! - `Idle`: nothing to do.
//!
//! Time is measured using `std::time::Instant`, which is monotonic and immune to system
//! clock changes. Callers pass `now` explicitly so the tracker stays deterministic.

use std::time::{Duration, Instant};

/// What the connection loop should do after a heartbeat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Nothing due yet.
    Idle,
    /// Send a ping to the peer.
    SendPing,
    /// The peer has been silent for longer than the timeout.
    Expired,
}

/// Tracks peer activity and ping scheduling for one connection.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    timeout: Duration,
    last_seen: Instant,
    last_ping: Instant,
}

impl Heartbeat {
    /// Create a tracker that starts counting from `now`.
    pub fn new(interval: Duration, timeout: Duration, now: Instant) -> Self {
        Self {
            interval,
            timeout,
            last_seen: now,
            last_ping: now,
        }
    }

    /// Record any inbound frame from the peer.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// Decide whether to ping the peer or give up on it.
    pub fn poll(&mut self, now: Instant) -> HeartbeatAction {
        if now.saturating_duration_since(self.last_seen) > self.timeout {
            return HeartbeatAction::Expired;
        }
        if now.saturating_duration_since(self.last_ping) >= self.interval {
            self.last_ping = now;
            return HeartbeatAction::SendPing;
        }
        HeartbeatAction::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pings_on_interval_and_expires_after_silence() {
        let start = Instant::now();
        let mut hb = Heartbeat::new(Duration::from_secs(10), Duration::from_secs(25), start);

        assert_eq!(hb.poll(start + Duration::from_secs(5)), HeartbeatAction::Idle);
        assert_eq!(hb.poll(start + Duration::from_secs(10)), HeartbeatAction::SendPing);
        assert_eq!(hb.poll(start + Duration::from_secs(15)), HeartbeatAction::Idle);
        assert_eq!(hb.poll(start + Duration::from_secs(20)), HeartbeatAction::SendPing);
        assert_eq!(hb.poll(start + Duration::from_secs(26)), HeartbeatAction::Expired);
    }

    #[test]
    fn activity_postpones_expiry() {
        let start = Instant::now();
        let mut hb = Heartbeat::new(Duration::from_secs(10), Duration::from_secs(25), start);

        hb.record_activity(start + Duration::from_secs(20));
        assert_ne!(hb.poll(start + Duration::from_secs(40)), HeartbeatAction::Expired);
        assert_eq!(hb.poll(start + Duration::from_secs(46)), HeartbeatAction::Expired);
    }
}
