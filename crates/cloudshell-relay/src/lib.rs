//! # cloudshell-relay
//!
//! Attaches a local terminal to a provisioned cloud shell session: creates
//! the remote pseudo-terminal, opens its websocket, forwards input and
//! output byte-for-byte, and keeps the connection alive with heartbeat
//! pings. Window resizes are pushed to the control plane, debounced and
//! gated by a per-session generation counter so superseded requests abandon
//! quietly.
//!
//! The relay never terminates the process itself; [`session::RelayOutcome`]
//! tells the driver whether the socket closed cleanly.

pub mod geometry;
pub mod heartbeat;
pub mod resize;
pub mod session;

pub use geometry::WindowSize;
pub use heartbeat::{Heartbeat, HeartbeatAction, HEARTBEAT_INTERVAL};
pub use resize::{ResizeCoordinator, RESIZE_ATTEMPTS, RESIZE_DEBOUNCE};
pub use session::{connect_terminal, RelayOutcome, TerminalRelay, CONNECT_ATTEMPTS, SOCKET_OPEN_ATTEMPTS};
