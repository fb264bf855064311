//! Error types for the room layer.

use multiroom_session::SessionError;
use multiroom_transport::ConnectionId;

use crate::SpaceError;

/// Errors produced while handling room requests.
///
/// Most of these never reach the client: an invalid create or join is
/// dropped and only logged. [`RoomError::LoadFailed`] is the exception and
/// is reported to the requester as a `CreateRoomFailed` message.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The connection already occupies a room.
    #[error("{0} is already in room {1:?}")]
    AlreadyInRoom(ConnectionId, String),

    /// Another active room has this name.
    #[error("a room named {0:?} already exists")]
    DuplicateRoomName(String),

    /// The room is at capacity.
    #[error("room {0:?} is full")]
    RoomFull(String),

    /// No active room has this name.
    #[error("room {0:?} not found")]
    RoomNotFound(String),

    /// The room's space could not be loaded.
    #[error("failed to load space for room {room:?}: {source}")]
    LoadFailed {
        room: String,
        #[source]
        source: SpaceError,
    },

    /// A queued request whose connection is gone.
    #[error("request from {0} is stale, connection is gone")]
    StaleRequest(ConnectionId),

    /// The connection index already maps this connection to a room.
    #[error("{0} is already bound to room {1:?}")]
    AlreadyBound(ConnectionId, String),

    /// The connection has a create request queued or in flight.
    #[error("{0} already has a pending create request")]
    CreatePending(ConnectionId),

    /// Malformed request (empty name, capacity out of range).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Too many create requests are waiting.
    #[error("creation queue is full ({0} pending)")]
    QueueFull(usize),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The coordinator task has stopped.
    #[error("room coordinator is unavailable")]
    Unavailable,
}
