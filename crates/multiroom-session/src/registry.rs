//! The connection registry: who is connected right now.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap`, not a concurrent one. It is
//! owned by the coordinator task and only touched between suspension
//! points, so no locking is needed.

use std::collections::HashMap;

use multiroom_protocol::ServerMessage;
use multiroom_transport::ConnectionId;

use crate::{OutboundSender, Session, SessionError};

/// Tracks every connected client and its outbound queue.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ [live] ──→ unregister()
///                   │
///                   └─(task dropped its receiver)─→ sweep_closed()
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is taken.
    pub fn register(
        &mut self,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&conn_id) {
            return Err(SessionError::AlreadyConnected(conn_id));
        }
        let session = self
            .sessions
            .entry(conn_id)
            .or_insert_with(|| Session::new(conn_id, outbound));
        tracing::info!(%conn_id, "connection registered");
        Ok(session)
    }

    /// Removes a connection. After this, [`is_live`](Self::is_live)
    /// returns `false` for it.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if it was never registered.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&conn_id)
            .ok_or(SessionError::NotFound(conn_id))?;
        tracing::info!(%conn_id, connected_for = ?session.age(), "connection unregistered");
        Ok(session)
    }

    /// Liveness check used to re-validate queued requests.
    pub fn is_live(&self, conn_id: ConnectionId) -> bool {
        self.sessions.get(&conn_id).is_some_and(Session::is_live)
    }

    /// Delivers a message to one connection.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: the connection is not registered
    /// - [`SessionError::Closed`]: registered, but its task is gone
    pub fn send(&self, conn_id: ConnectionId, msg: ServerMessage) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(&conn_id)
            .ok_or(SessionError::NotFound(conn_id))?;
        session.send(msg).map_err(|_| SessionError::Closed(conn_id))
    }

    /// Returns the ids of sessions whose outbound receiver was dropped
    /// without a disconnect being reported. The caller is expected to
    /// run its disconnect path for each of them.
    pub fn sweep_closed(&self) -> Vec<ConnectionId> {
        let mut closed: Vec<ConnectionId> = self
            .sessions
            .values()
            .filter(|s| !s.is_live())
            .map(|s| s.conn_id)
            .collect();
        closed.sort();
        closed
    }

    /// Looks up a session.
    pub fn get(&self, conn_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
