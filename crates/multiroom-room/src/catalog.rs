//! The catalog of active rooms.

use std::collections::{BTreeMap, HashMap, HashSet};

use multiroom_protocol::RoomListEntry;
use multiroom_transport::ConnectionId;

use crate::{RoomError, SpaceHandle};

/// A named room backed by one loaded space.
#[derive(Debug, Clone)]
pub struct Room {
    name: String,
    data: String,
    space_id: String,
    max_occupancy: usize,
    space_handle: SpaceHandle,
    members: HashSet<ConnectionId>,
}

impl Room {
    /// An empty room. The creator is admitted separately.
    pub fn new(
        name: impl Into<String>,
        data: impl Into<String>,
        space_id: impl Into<String>,
        max_occupancy: usize,
        space_handle: SpaceHandle,
    ) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            space_id: space_id.into(),
            max_occupancy,
            space_handle,
            members: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn space_handle(&self) -> SpaceHandle {
        self.space_handle
    }

    pub fn max_occupancy(&self) -> usize {
        self.max_occupancy
    }

    /// Number of members. Always equal to the member set's size.
    pub fn occupancy(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.members.contains(&conn_id)
    }

    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.iter().copied()
    }

    /// Admits a member.
    ///
    /// # Errors
    /// [`RoomError::RoomFull`] at capacity. Adding an existing member is a
    /// no-op.
    pub fn add_member(&mut self, conn_id: ConnectionId) -> Result<(), RoomError> {
        if self.members.contains(&conn_id) {
            return Ok(());
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.name.clone()));
        }
        self.members.insert(conn_id);
        Ok(())
    }

    /// Removes a member, returning whether it was present.
    pub fn remove_member(&mut self, conn_id: ConnectionId) -> bool {
        self.members.remove(&conn_id)
    }

    /// Snapshot for listings.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            data: self.data.clone(),
            space_id: self.space_id.clone(),
            occupancy: self.occupancy(),
            max_occupancy: self.max_occupancy,
        }
    }
}

/// Owned snapshot of one room, detached from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: String,
    pub data: String,
    pub space_id: String,
    pub occupancy: usize,
    pub max_occupancy: usize,
}

impl From<RoomSummary> for RoomListEntry {
    fn from(s: RoomSummary) -> Self {
        RoomListEntry {
            room_name: s.name,
            room_data: s.data,
            space_identifier: s.space_id,
            current_count: s.occupancy,
            max_count: s.max_occupancy,
        }
    }
}

/// Active rooms keyed by name, listed in insertion order.
#[derive(Debug, Default)]
pub struct RoomCatalog {
    rooms: HashMap<String, (u64, Room)>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl RoomCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if an active room has this name.
    pub fn exists(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    pub fn find(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name).map(|(_, room)| room)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name).map(|(_, room)| room)
    }

    /// The room backed by `handle`, if any.
    pub fn find_by_space(&self, handle: SpaceHandle) -> Option<&Room> {
        self.rooms
            .values()
            .map(|(_, room)| room)
            .find(|room| room.space_handle == handle)
    }

    /// Adds a room at the end of the listing.
    ///
    /// # Errors
    /// [`RoomError::DuplicateRoomName`] if the name is taken; the catalog
    /// is left unchanged.
    pub fn add(&mut self, room: Room) -> Result<(), RoomError> {
        if self.rooms.contains_key(&room.name) {
            return Err(RoomError::DuplicateRoomName(room.name));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, room.name.clone());
        self.rooms.insert(room.name.clone(), (seq, room));
        Ok(())
    }

    /// Removes and returns a room.
    pub fn remove(&mut self, name: &str) -> Option<Room> {
        let (seq, room) = self.rooms.remove(name)?;
        self.order.remove(&seq);
        Some(room)
    }

    /// Rooms in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.order
            .values()
            .filter_map(|name| self.rooms.get(name).map(|(_, room)| room))
    }

    /// Snapshot of every room in insertion order.
    pub fn list(&self) -> Vec<RoomSummary> {
        self.iter().map(Room::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
