//! Message shapes exchanged between clients and the room coordinator.
//!
//! Every frame on the wire is an [`Envelope`] wrapping either a
//! [`ClientMessage`] (client → server) or a [`ServerMessage`]
//! (server → client). Field names are camelCase on the wire so that
//! engine-side clients can keep their existing message definitions.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame. `seq` is maintained independently by each side
/// and is only used for ordering diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Sender-local, monotonically increasing sequence number.
    pub seq: u64,
    /// The message itself.
    pub payload: M,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Request to create a new room and be placed into it.
///
/// There is no direct reply. On success the requester receives a
/// [`ServerMessage::SpaceTransition`]; on validation failure the request
/// is silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomMessage {
    /// Name of the room. Must be unique among active rooms.
    pub room_name: String,
    /// Application-defined payload, stored and listed verbatim.
    pub room_data: String,
    /// Which space to load for the room.
    pub space_identifier: String,
    /// Capacity of the room, including the creator.
    pub max_players: usize,
}

/// Request to join an existing room by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomMessage {
    pub room_name: String,
}

/// Everything a client can send.
///
/// Internally tagged: `{ "type": "JoinRoom", "roomName": "Arena" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// "Show me the rooms." Answered with [`ServerMessage::RoomListResponse`].
    RoomListRequest,
    CreateRoom(CreateRoomMessage),
    JoinRoom(JoinRoomMessage),
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// One row of a room listing. Not a wire type: the wire carries
/// [`RoomListResponse`]'s parallel arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListEntry {
    pub room_name: String,
    pub room_data: String,
    pub space_identifier: String,
    pub current_count: usize,
    pub max_count: usize,
}

/// Snapshot of the room catalog as parallel arrays of equal length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListResponse {
    pub room_names: Vec<String>,
    pub room_data: Vec<String>,
    pub space_identifiers: Vec<String>,
    pub current_counts: Vec<usize>,
    pub max_counts: Vec<usize>,
}

impl RoomListResponse {
    /// Builds a response from rows, keeping the arrays in lockstep.
    pub fn from_entries(entries: impl IntoIterator<Item = RoomListEntry>) -> Self {
        let mut resp = Self::default();
        for entry in entries {
            resp.room_names.push(entry.room_name);
            resp.room_data.push(entry.room_data);
            resp.space_identifiers.push(entry.space_identifier);
            resp.current_counts.push(entry.current_count);
            resp.max_counts.push(entry.max_count);
        }
        resp
    }

    /// Number of rooms listed.
    pub fn len(&self) -> usize {
        self.room_names.len()
    }

    /// Returns `true` if no rooms are listed.
    pub fn is_empty(&self) -> bool {
        self.room_names.is_empty()
    }

    /// Zips the arrays back into rows.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the arrays differ in
    /// length, which a well-behaved server never produces.
    pub fn entries(&self) -> Result<Vec<RoomListEntry>, ProtocolError> {
        let n = self.room_names.len();
        if self.room_data.len() != n
            || self.space_identifiers.len() != n
            || self.current_counts.len() != n
            || self.max_counts.len() != n
        {
            return Err(ProtocolError::InvalidMessage(
                "room list arrays differ in length".into(),
            ));
        }
        Ok((0..n)
            .map(|i| RoomListEntry {
                room_name: self.room_names[i].clone(),
                room_data: self.room_data[i].clone(),
                space_identifier: self.space_identifiers[i].clone(),
                current_count: self.current_counts[i],
                max_count: self.max_counts[i],
            })
            .collect())
    }
}

/// How the client should bring the named space in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceOperation {
    /// Load the space alongside whatever is already loaded.
    LoadAdditive,
}

/// Tells a client to start loading the space of the room it was just
/// admitted to. Sent exactly once per successful create or join, before
/// the client's entity is moved into that space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceTransitionNotification {
    pub space_identifier: String,
    pub operation: SpaceOperation,
}

impl SpaceTransitionNotification {
    /// An additive load of `space_identifier`.
    pub fn load_additive(space_identifier: impl Into<String>) -> Self {
        Self {
            space_identifier: space_identifier.into(),
            operation: SpaceOperation::LoadAdditive,
        }
    }
}

/// Sent to the requester when its room's space could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomFailed {
    pub room_name: String,
    pub reason: String,
}

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    RoomListResponse(RoomListResponse),
    SpaceTransition(SpaceTransitionNotification),
    CreateRoomFailed(CreateRoomFailed),
}

// =========================================================================
// Tests
// =========================================================================
