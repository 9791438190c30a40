use std::time::Duration;

/// Interval between liveness pings on the relay socket.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(60_000);

/// What the relay loop should do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// The peer answered since the last tick; send the next ping.
    Ping,
    /// No pong arrived within one interval; tear the connection down.
    Timeout,
    /// Already timed out; nothing left to do.
    Idle,
}

/// Ping/pong liveness state for the relay socket.
///
/// A pong must arrive between two consecutive ticks; the first missed
/// interval reports [`HeartbeatAction::Timeout`] exactly once.
#[derive(Debug)]
pub struct Heartbeat {
    alive: bool,
    timed_out: bool,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            alive: true,
            timed_out: false,
        }
    }

    /// Record a pong from the peer.
    pub fn pong(&mut self) {
        self.alive = true;
    }

    /// Advance one interval and decide the next action.
    pub fn tick(&mut self) -> HeartbeatAction {
        if self.timed_out {
            return HeartbeatAction::Idle;
        }
        if self.alive {
            self.alive = false;
            HeartbeatAction::Ping
        } else {
            self.timed_out = true;
            HeartbeatAction::Timeout
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}
