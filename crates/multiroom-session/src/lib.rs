//! Connection registry for Multiroom.
//!
//! The room coordinator needs two things from the connection layer:
//!
//! 1. **Liveness**: is this connection still here? Queued create requests
//!    hold only a [`ConnectionId`](multiroom_transport::ConnectionId), and
//!    are re-checked against the registry before any work starts.
//! 2. **Delivery**: push a [`ServerMessage`](multiroom_protocol::ServerMessage)
//!    to one connection without knowing anything about sockets.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room coordinator (above)  ← asks is_live / send
//!     ↕
//! Session layer (this crate)  ← one Session per connected client
//!     ↕
//! Transport (below)  ← the per-connection task drains the outbound channel
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::ConnectionRegistry;
pub use session::{OutboundReceiver, OutboundSender, Session, outbound_channel};
