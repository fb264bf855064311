//! Session protocol handling: turning client messages into coordinator
//! operations.
//!
//! Listing is answered synchronously from the catalog. Create requests are
//! checked cheaply on receipt and then queued; the authoritative checks run
//! again when the request reaches the head of the creation queue. Joins
//! are applied immediately.
//!
//! Rejections are returned as errors for the caller to log. None of them
//! is reported to the client.

use multiroom_protocol::{
    ClientMessage, CreateRoomMessage, JoinRoomMessage, RoomListResponse, ServerMessage,
};
use multiroom_transport::ConnectionId;
use tracing::debug;

use crate::{Coordinator, EntityPlacement, PendingCreateRequest, RoomError};

impl<P: EntityPlacement> Coordinator<P> {
    /// Routes one decoded client message.
    ///
    /// # Errors
    /// [`RoomError::StaleRequest`] if the connection is not registered,
    /// otherwise whatever the specific handler rejects with.
    pub fn handle_message(&mut self, conn_id: ConnectionId, msg: ClientMessage) -> Result<(), RoomError> {
        if !self.connections.is_live(conn_id) {
            return Err(RoomError::StaleRequest(conn_id));
        }
        match msg {
            ClientMessage::RoomListRequest => self.on_list_request(conn_id),
            ClientMessage::CreateRoom(create) => self.on_create_request(conn_id, create),
            ClientMessage::JoinRoom(join) => self.on_join_request(conn_id, join),
        }
    }

    /// Replies with every active room, in insertion order.
    pub fn on_list_request(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        let response = RoomListResponse::from_entries(self.catalog.list().into_iter().map(Into::into));
        debug!(%conn_id, rooms = response.len(), "sending room list");
        self.connections
            .send(conn_id, ServerMessage::RoomListResponse(response))?;
        Ok(())
    }

    /// Queues a create request.
    ///
    /// Nothing is created here. The request waits in the creation queue
    /// and is dropped silently if, by the time it is processed, its
    /// requester has gone, joined a room, or lost the name to an earlier
    /// request.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInRoom`] if the requester occupies a room
    /// - [`RoomError::InvalidRequest`] for an empty name or a capacity
    ///   outside `1..=max_players_limit`
    /// - [`RoomError::DuplicateRoomName`] if an active room has the name
    /// - [`RoomError::CreatePending`] if the requester already has a
    ///   request queued or loading
    /// - [`RoomError::QueueFull`] if too many requests are waiting
    pub fn on_create_request(
        &mut self,
        conn_id: ConnectionId,
        msg: CreateRoomMessage,
    ) -> Result<(), RoomError> {
        if let Some(current) = self.index.room_of(conn_id) {
            return Err(RoomError::AlreadyInRoom(conn_id, current.to_string()));
        }
        if msg.room_name.is_empty() {
            return Err(RoomError::InvalidRequest("room name is empty".into()));
        }
        let limit = self.config().max_players_limit;
        if !(1..=limit).contains(&msg.max_players) {
            return Err(RoomError::InvalidRequest(format!(
                "maxPlayers {} is outside 1..={limit}",
                msg.max_players
            )));
        }
        if self.catalog.exists(&msg.room_name) {
            return Err(RoomError::DuplicateRoomName(msg.room_name));
        }
        let in_flight = self
            .creating
            .as_ref()
            .is_some_and(|wf| wf.request().requester == conn_id);
        if in_flight || self.creations.has_request_from(conn_id) {
            return Err(RoomError::CreatePending(conn_id));
        }

        let request = PendingCreateRequest::from_message(conn_id, msg);
        let room_name = request.room_name.clone();
        self.creations
            .push(request)
            .map_err(|_| RoomError::QueueFull(self.creations.len()))?;
        debug!(
            %conn_id,
            room = %room_name,
            queued = self.creations.len(),
            "create request queued"
        );
        Ok(())
    }

    /// Admits the connection to an existing room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInRoom`], [`RoomError::RoomNotFound`] or
    /// [`RoomError::RoomFull`]. State is unchanged on error.
    pub fn on_join_request(&mut self, conn_id: ConnectionId, msg: JoinRoomMessage) -> Result<(), RoomError> {
        if let Some(current) = self.index.room_of(conn_id) {
            return Err(RoomError::AlreadyInRoom(conn_id, current.to_string()));
        }
        self.admit(conn_id, &msg.room_name)
    }
}
