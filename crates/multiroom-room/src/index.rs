//! The connection → room index.

use std::collections::{HashMap, HashSet};

use multiroom_transport::ConnectionId;

use crate::RoomError;

/// Bidirectional map between connections and the room each occupies.
///
/// A connection maps to at most one room. The reverse direction keeps the
/// member set of each room so that "who is in X" never scans every
/// connection.
#[derive(Debug, Default)]
pub struct ConnectionRoomIndex {
    by_conn: HashMap<ConnectionId, String>,
    by_room: HashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `conn_id` now occupies `room_name`.
    ///
    /// # Errors
    /// [`RoomError::AlreadyBound`] if the connection already maps to a
    /// room, including the same one.
    pub fn bind(&mut self, conn_id: ConnectionId, room_name: &str) -> Result<(), RoomError> {
        if let Some(current) = self.by_conn.get(&conn_id) {
            return Err(RoomError::AlreadyBound(conn_id, current.clone()));
        }
        self.by_conn.insert(conn_id, room_name.to_string());
        self.by_room
            .entry(room_name.to_string())
            .or_default()
            .insert(conn_id);
        Ok(())
    }

    /// Drops the connection's mapping, returning the room it was in.
    pub fn unbind(&mut self, conn_id: ConnectionId) -> Option<String> {
        let room_name = self.by_conn.remove(&conn_id)?;
        if let Some(members) = self.by_room.get_mut(&room_name) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.by_room.remove(&room_name);
            }
        }
        Some(room_name)
    }

    /// The room a connection occupies, if any.
    pub fn room_of(&self, conn_id: ConnectionId) -> Option<&str> {
        self.by_conn.get(&conn_id).map(String::as_str)
    }

    /// Number of connections bound to `room_name`.
    pub fn count_in(&self, room_name: &str) -> usize {
        self.by_room.get(room_name).map_or(0, HashSet::len)
    }

    /// All (connection, room) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, &str)> {
        self.by_conn.iter().map(|(c, r)| (*c, r.as_str()))
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.by_conn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_conn.is_empty()
    }
}
