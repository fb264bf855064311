//! Hooks for moving a connection's controlled entity between spaces.

use multiroom_transport::ConnectionId;

use crate::SpaceHandle;

/// Which kind of entity a connection controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The placeholder entity a connection gets while browsing rooms.
    Lobby,
    /// The in-room entity.
    Room,
}

/// Entity side effects of admitting a connection to a room.
///
/// Calls are fire-and-forget: the coordinator does not wait for them or
/// inspect their outcome. Implementations must not block.
pub trait EntityPlacement: Send + Sync + 'static {
    /// Gives a freshly connected connection its lobby entity.
    fn spawn_lobby_entity(&self, conn_id: ConnectionId);

    /// Replaces whatever entity the connection controls with one of `kind`.
    fn replace_controlled_entity(&self, conn_id: ConnectionId, kind: EntityKind);

    /// Moves the connection's entity into `space`.
    fn relocate(&self, conn_id: ConnectionId, space: SpaceHandle);
}

/// Placement that only logs. Used when entities live entirely on the
/// client side.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPlacement;

impl EntityPlacement for LogPlacement {
    fn spawn_lobby_entity(&self, conn_id: ConnectionId) {
        tracing::debug!(%conn_id, "lobby entity spawned");
    }

    fn replace_controlled_entity(&self, conn_id: ConnectionId, kind: EntityKind) {
        tracing::debug!(%conn_id, ?kind, "controlled entity replaced");
    }

    fn relocate(&self, conn_id: ConnectionId, space: SpaceHandle) {
        tracing::debug!(%conn_id, %space, "entity relocated");
    }
}
