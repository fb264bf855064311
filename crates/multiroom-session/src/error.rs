//! Error types for the session layer.

use multiroom_transport::ConnectionId;

/// Errors that can occur while tracking connections.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the connection. It never registered, or it
    /// already disconnected.
    #[error("no session for {0}")]
    NotFound(ConnectionId),

    /// The connection is already registered. A connection id is only
    /// ever handed out once by a transport, so this points at a bug in
    /// the caller.
    #[error("{0} is already registered")]
    AlreadyConnected(ConnectionId),

    /// The session exists but its outbound channel has been dropped,
    /// i.e. the connection task is gone.
    #[error("outbound channel for {0} is closed")]
    Closed(ConnectionId),
}
