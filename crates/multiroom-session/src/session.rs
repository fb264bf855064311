//! A single connected client, as seen by the coordinator.

use std::time::{Duration, Instant};

use multiroom_protocol::ServerMessage;
use multiroom_transport::ConnectionId;
use tokio::sync::mpsc;

/// Sender half of a connection's outbound queue. Held by the registry.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// Receiver half, drained by the per-connection task that owns the socket.
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Creates the outbound queue for a new connection.
///
/// Unbounded because the coordinator must never suspend on a slow
/// client; it sends at most a handful of messages per request.
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// The registry's record of one live connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which connection this session belongs to.
    pub conn_id: ConnectionId,

    /// When the connection registered.
    pub connected_at: Instant,

    outbound: OutboundSender,
}

impl Session {
    pub(crate) fn new(conn_id: ConnectionId, outbound: OutboundSender) -> Self {
        Self {
            conn_id,
            connected_at: Instant::now(),
            outbound,
        }
    }

    /// A session is live while the task draining its outbound queue is.
    pub fn is_live(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// How long the connection has been registered.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Queues a message. Returns it back if the receiver is gone.
    pub(crate) fn send(&self, msg: ServerMessage) -> Result<(), ServerMessage> {
        self.outbound.send(msg).map_err(|e| e.0)
    }
}
