//! Unified error type for Multiroom.

use multiroom_protocol::ProtocolError;
use multiroom_room::RoomError;
use multiroom_session::SessionError;
use multiroom_transport::TransportError;

/// Top-level error wrapping every crate-specific error, so `?` works
/// across layers.
#[derive(Debug, thiserror::Error)]
pub enum MultiroomError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode or decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection registry failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Rejected room request, or the coordinator is gone.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use multiroom_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: MultiroomError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, MultiroomError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: MultiroomError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, MultiroomError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: MultiroomError = SessionError::NotFound(ConnectionId::new(3)).into();
        assert!(matches!(err, MultiroomError::Session(_)));
        assert!(err.to_string().contains("conn-3"));
    }

    #[test]
    fn test_from_room_error() {
        let err: MultiroomError = RoomError::RoomFull("Arena".into()).into();
        assert!(matches!(err, MultiroomError::Room(_)));
        assert!(err.to_string().contains("Arena"));
    }
}
