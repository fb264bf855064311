//! The room lifecycle coordinator.
//!
//! [`Coordinator`] owns every piece of shared room state: the connection
//! registry, the connection → room index, the room catalog and both
//! serializers. It is deliberately synchronous. Every method runs to
//! completion, so each one is atomic with respect to every other event.
//!
//! The only suspending work, loading and unloading spaces, is handed out
//! as [`SpaceCommand`]s by [`drain`](Coordinator::drain) and fed back in
//! through [`complete_load`](Coordinator::complete_load) and
//! [`complete_unload`](Coordinator::complete_unload). The actor in
//! [`crate::spawn_coordinator`] runs those commands against a
//! [`SpaceLoader`](crate::SpaceLoader); tests can run them by hand.
//!
//! ```text
//!  connect / message / disconnect
//!              │
//!              ▼
//!     ┌─────────────────┐  drain()   ┌─────────────┐
//!     │   Coordinator   │ ─────────→ │ SpaceLoader │
//!     │ (index, catalog │            └─────────────┘
//!     │  serializers)   │ ←───────── complete_load / complete_unload
//!     └─────────────────┘
//! ```

use std::collections::HashSet;

use multiroom_protocol::{CreateRoomFailed, ServerMessage, SpaceTransitionNotification};
use multiroom_session::{ConnectionRegistry, OutboundSender};
use multiroom_transport::ConnectionId;
use tracing::{debug, info, warn};

use crate::{
    ConnectionRoomIndex, CoordinatorConfig, CreationSerializer, CreationState, CreationWorkflow,
    EntityKind, EntityPlacement, PendingCreateRequest, PendingTeardown, Room, RoomCatalog,
    RoomError, RoomSummary, SpaceError, SpaceHandle, TeardownSerializer, WorkflowId,
};

/// Suspending work requested by [`Coordinator::drain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceCommand {
    /// Load `space_id`, then report back with
    /// [`Coordinator::complete_load`] for `workflow`.
    Load {
        workflow: WorkflowId,
        space_id: String,
    },
    /// Unload `handle`, then report back with
    /// [`Coordinator::complete_unload`].
    Unload { handle: SpaceHandle },
}

/// Counters describing the coordinator at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub connections: usize,
    pub rooms: usize,
    pub pending_creations: usize,
    pub pending_teardowns: usize,
    pub creation_in_flight: bool,
    pub teardown_in_flight: bool,
    pub loaded_spaces: usize,
}

/// Owns all room state and sequences every mutation of it.
pub struct Coordinator<P> {
    config: CoordinatorConfig,
    pub(crate) connections: ConnectionRegistry,
    pub(crate) index: ConnectionRoomIndex,
    pub(crate) catalog: RoomCatalog,
    pub(crate) creations: CreationSerializer,
    teardowns: TeardownSerializer,
    pub(crate) creating: Option<CreationWorkflow>,
    unloading: Option<PendingTeardown>,
    loaded: HashSet<SpaceHandle>,
    placement: P,
    next_workflow: u64,
}

impl<P: EntityPlacement> Coordinator<P> {
    pub fn new(config: CoordinatorConfig, placement: P) -> Self {
        let creations = CreationSerializer::with_capacity(config.max_pending_creations);
        Self {
            config,
            connections: ConnectionRegistry::new(),
            index: ConnectionRoomIndex::new(),
            catalog: RoomCatalog::new(),
            creations,
            teardowns: TeardownSerializer::unbounded(),
            creating: None,
            unloading: None,
            loaded: HashSet::new(),
            placement,
            next_workflow: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Registers a connection and gives it a lobby entity.
    ///
    /// # Errors
    /// [`RoomError::Session`] if the id is already registered.
    pub fn connect(
        &mut self,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<(), RoomError> {
        self.connections.register(conn_id, outbound)?;
        self.placement.spawn_lobby_entity(conn_id);
        Ok(())
    }

    /// Forgets a connection and takes it out of its room, if any.
    ///
    /// A room left empty is removed from the catalog immediately and its
    /// space is queued for teardown. A create request the connection still
    /// has queued is not touched here; it is dropped when it reaches the
    /// head of the queue. Returns the room the connection left.
    pub fn disconnect(&mut self, conn_id: ConnectionId) -> Option<String> {
        if let Err(e) = self.connections.unregister(conn_id) {
            debug!(%conn_id, error = %e, "disconnect for unregistered connection");
        }
        self.leave(conn_id)
    }

    fn leave(&mut self, conn_id: ConnectionId) -> Option<String> {
        let room_name = self.index.unbind(conn_id)?;
        let Some(room) = self.catalog.find_mut(&room_name) else {
            warn!(%conn_id, room = %room_name, "index referenced a missing room");
            return Some(room_name);
        };
        room.remove_member(conn_id);
        info!(
            %conn_id,
            room = %room_name,
            occupancy = room.occupancy(),
            "connection left room"
        );
        if room.is_empty() {
            self.retire_room(&room_name);
        }
        Some(room_name)
    }

    fn retire_room(&mut self, room_name: &str) {
        if let Some(room) = self.catalog.remove(room_name) {
            info!(
                room = %room_name,
                space = %room.space_handle(),
                "room removed, space queued for teardown"
            );
            self.enqueue_teardown(room.space_handle(), room_name);
        }
    }

    fn enqueue_teardown(&mut self, handle: SpaceHandle, room_name: &str) {
        let unloading = self.unloading.as_ref().is_some_and(|t| t.handle == handle);
        if unloading || self.teardowns.is_queued(handle) {
            return;
        }
        if self
            .teardowns
            .push(PendingTeardown::new(handle, room_name))
            .is_err()
        {
            warn!(space = %handle, "teardown queue rejected space");
        }
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Places a connection into an existing room: bind, count, notify,
    /// swap the entity and move it into the room's space.
    ///
    /// The space transition is always sent before the entity is moved.
    pub(crate) fn admit(&mut self, conn_id: ConnectionId, room_name: &str) -> Result<(), RoomError> {
        let room = self
            .catalog
            .find_mut(room_name)
            .ok_or_else(|| RoomError::RoomNotFound(room_name.to_string()))?;
        if room.is_full() {
            return Err(RoomError::RoomFull(room_name.to_string()));
        }
        self.index.bind(conn_id, room_name)?;
        if let Err(e) = room.add_member(conn_id) {
            self.index.unbind(conn_id);
            return Err(e);
        }

        let handle = room.space_handle();
        let space_id = room.space_id().to_string();
        info!(
            %conn_id,
            room = %room_name,
            occupancy = room.occupancy(),
            max = room.max_occupancy(),
            "connection admitted to room"
        );

        self.notify(
            conn_id,
            ServerMessage::SpaceTransition(SpaceTransitionNotification::load_additive(space_id)),
        );
        self.placement
            .replace_controlled_entity(conn_id, EntityKind::Room);
        self.placement.relocate(conn_id, handle);
        Ok(())
    }

    pub(crate) fn notify(&self, conn_id: ConnectionId, msg: ServerMessage) {
        if let Err(e) = self.connections.send(conn_id, msg) {
            debug!(%conn_id, error = %e, "dropping outbound message");
        }
    }

    // -----------------------------------------------------------------------
    // Draining
    // -----------------------------------------------------------------------

    /// Advances both serializers.
    ///
    /// Connections whose outbound queue has closed are disconnected first.
    /// Then, if no creation is in flight, queued create requests are
    /// re-validated from the head; invalid ones are dropped and the first
    /// valid one starts loading. The teardown serializer is advanced the
    /// same way. Returns the loads and unloads to run.
    pub fn drain(&mut self) -> Vec<SpaceCommand> {
        for conn_id in self.connections.sweep_closed() {
            debug!(%conn_id, "outbound queue closed, disconnecting");
            self.disconnect(conn_id);
        }

        let mut commands = Vec::new();
        if let Some(cmd) = self.start_next_creation() {
            commands.push(cmd);
        }
        if let Some(cmd) = self.start_next_teardown() {
            commands.push(cmd);
        }
        commands
    }

    fn start_next_creation(&mut self) -> Option<SpaceCommand> {
        while let Some(request) = self.creations.begin() {
            if let Err(e) = self.revalidate(&request) {
                debug!(
                    requester = %request.requester,
                    room = %request.room_name,
                    reason = %e,
                    "dropping queued create request"
                );
                self.creations.finish();
                continue;
            }

            let id = WorkflowId(self.next_workflow);
            self.next_workflow += 1;
            let space_id = request.space_id.clone();
            info!(
                workflow = %id,
                requester = %request.requester,
                room = %request.room_name,
                %space_id,
                "loading space for new room"
            );

            let mut workflow = CreationWorkflow::new(id, request);
            workflow.advance(CreationState::SpaceLoading);
            self.creating = Some(workflow);
            return Some(SpaceCommand::Load {
                workflow: id,
                space_id,
            });
        }
        None
    }

    /// Checks a create request against the current state.
    fn revalidate(&self, request: &PendingCreateRequest) -> Result<(), RoomError> {
        if !self.connections.is_live(request.requester) {
            return Err(RoomError::StaleRequest(request.requester));
        }
        if let Some(current) = self.index.room_of(request.requester) {
            return Err(RoomError::AlreadyInRoom(
                request.requester,
                current.to_string(),
            ));
        }
        if self.catalog.exists(&request.room_name) {
            return Err(RoomError::DuplicateRoomName(request.room_name.clone()));
        }
        Ok(())
    }

    fn start_next_teardown(&mut self) -> Option<SpaceCommand> {
        while let Some(teardown) = self.teardowns.begin() {
            if !self.loaded.contains(&teardown.handle) {
                warn!(
                    space = %teardown.handle,
                    room = %teardown.room_name,
                    "space is not loaded, skipping teardown"
                );
                self.teardowns.finish();
                continue;
            }
            if let Some(room) = self.catalog.find_by_space(teardown.handle) {
                warn!(
                    space = %teardown.handle,
                    room = %room.name(),
                    "space still backs a listed room, skipping teardown"
                );
                self.teardowns.finish();
                continue;
            }
            let handle = teardown.handle;
            info!(
                space = %handle,
                room = %teardown.room_name,
                waited = ?teardown.queued_at.elapsed(),
                "unloading space"
            );
            self.unloading = Some(teardown);
            return Some(SpaceCommand::Unload { handle });
        }
        None
    }

    // -----------------------------------------------------------------------
    // Completions
    // -----------------------------------------------------------------------

    /// Applies the result of a [`SpaceCommand::Load`].
    ///
    /// On failure the requester gets a `CreateRoomFailed`. On success the
    /// requester is re-checked: if it is still connected and not in a room,
    /// the room is registered and the requester placed into it. Otherwise
    /// the creation is abandoned and the space queued for teardown.
    pub fn complete_load(&mut self, workflow: WorkflowId, result: Result<SpaceHandle, SpaceError>) {
        let Some(mut wf) = self.creating.take_if(|wf| wf.id() == workflow) else {
            warn!(%workflow, "load completion for unknown workflow");
            if let Ok(handle) = result {
                self.loaded.insert(handle);
                self.enqueue_teardown(handle, "");
            }
            return;
        };
        self.creations.finish();

        let handle = match result {
            Ok(handle) => handle,
            Err(source) => {
                wf.advance(CreationState::Failed);
                let request = wf.request();
                let err = RoomError::LoadFailed {
                    room: request.room_name.clone(),
                    source,
                };
                warn!(%workflow, requester = %request.requester, error = %err, "room creation failed");
                self.notify(
                    request.requester,
                    ServerMessage::CreateRoomFailed(CreateRoomFailed {
                        room_name: request.room_name.clone(),
                        reason: err.to_string(),
                    }),
                );
                return;
            }
        };

        self.loaded.insert(handle);
        wf.advance(CreationState::Registering);
        let request = wf.request().clone();

        if let Err(reason) = self.revalidate(&request) {
            self.abandon(&mut wf, handle, &reason);
            return;
        }
        let room = Room::new(
            request.room_name.as_str(),
            request.room_data.as_str(),
            request.space_id.as_str(),
            request.max_occupancy,
            handle,
        );
        if let Err(reason) = self.catalog.add(room) {
            self.abandon(&mut wf, handle, &reason);
            return;
        }
        info!(%workflow, room = %request.room_name, space = %handle, "room registered");

        wf.advance(CreationState::PlacingRequester);
        if let Err(reason) = self.admit(request.requester, &request.room_name) {
            self.abandon(&mut wf, handle, &reason);
            return;
        }
        wf.advance(CreationState::Complete);
    }

    fn abandon(&mut self, wf: &mut CreationWorkflow, handle: SpaceHandle, reason: &RoomError) {
        wf.advance(CreationState::Abandoned);
        let room_name = wf.request().room_name.clone();
        info!(
            workflow = %wf.id(),
            room = %room_name,
            space = %handle,
            %reason,
            "creation abandoned, space queued for teardown"
        );
        let ours = self
            .catalog
            .find(&room_name)
            .is_some_and(|room| room.space_handle() == handle);
        if ours {
            self.catalog.remove(&room_name);
        }
        self.enqueue_teardown(handle, &room_name);
    }

    /// Applies the result of a [`SpaceCommand::Unload`]. The space is
    /// forgotten either way.
    pub fn complete_unload(&mut self, handle: SpaceHandle, result: Result<(), SpaceError>) {
        match self.unloading.take_if(|t| t.handle == handle) {
            Some(_) => self.teardowns.finish(),
            None => warn!(space = %handle, "unload completion for a space not being unloaded"),
        }
        self.loaded.remove(&handle);
        match result {
            Ok(()) => info!(space = %handle, "space unloaded"),
            Err(e) => warn!(space = %handle, error = %e, "space unload failed"),
        }
    }

    /// Stops both serializers and hands back every loaded space so the
    /// caller can unload them. Queued requests are discarded.
    pub fn shutdown(&mut self) -> Vec<SpaceHandle> {
        let dropped = self.creations.len() + usize::from(self.creating.is_some());
        if dropped > 0 {
            info!(dropped, "discarding pending create requests");
        }
        self.creations = CreationSerializer::with_capacity(self.config.max_pending_creations);
        self.teardowns = TeardownSerializer::unbounded();
        self.creating = None;
        self.unloading = None;
        let mut handles: Vec<_> = self.loaded.drain().collect();
        handles.sort();
        handles
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn placement(&self) -> &P {
        &self.placement
    }

    pub fn catalog(&self) -> &RoomCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &ConnectionRoomIndex {
        &self.index
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Snapshot of the catalog in insertion order.
    pub fn list(&self) -> Vec<RoomSummary> {
        self.catalog.list()
    }

    pub fn room_of(&self, conn_id: ConnectionId) -> Option<&str> {
        self.index.room_of(conn_id)
    }

    /// State of the in-flight creation, if any.
    pub fn creation_state(&self) -> Option<CreationState> {
        self.creating.as_ref().map(CreationWorkflow::state)
    }

    pub fn is_loaded(&self, handle: SpaceHandle) -> bool {
        self.loaded.contains(&handle)
    }

    /// Loaded spaces, sorted.
    pub fn loaded_spaces(&self) -> Vec<SpaceHandle> {
        let mut handles: Vec<_> = self.loaded.iter().copied().collect();
        handles.sort();
        handles
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            connections: self.connections.len(),
            rooms: self.catalog.len(),
            pending_creations: self.creations.len(),
            pending_teardowns: self.teardowns.len(),
            creation_in_flight: self.creations.is_in_flight(),
            teardown_in_flight: self.teardowns.is_in_flight(),
            loaded_spaces: self.loaded.len(),
        }
    }

    /// Verifies that the index, the catalog and the serializers agree.
    ///
    /// # Errors
    /// A description of the first inconsistency found.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (conn_id, room_name) in self.index.iter() {
            let room = self
                .catalog
                .find(room_name)
                .ok_or_else(|| format!("{conn_id} is bound to missing room {room_name:?}"))?;
            if !room.contains(conn_id) {
                return Err(format!("{conn_id} is bound to {room_name:?} but not a member"));
            }
        }
        for room in self.catalog.iter() {
            if room.occupancy() > room.max_occupancy() {
                return Err(format!("room {:?} is over capacity", room.name()));
            }
            if room.occupancy() != self.index.count_in(room.name()) {
                return Err(format!("room {:?} occupancy disagrees with index", room.name()));
            }
            if room.is_empty() {
                return Err(format!("room {:?} is empty but still listed", room.name()));
            }
            if !self.loaded.contains(&room.space_handle()) {
                return Err(format!("room {:?} has an unloaded space", room.name()));
            }
            for member in room.members() {
                if self.index.room_of(member) != Some(room.name()) {
                    return Err(format!("{member} in {:?} is not indexed", room.name()));
                }
            }
        }
        if self.creating.is_some() != self.creations.is_in_flight() {
            return Err("creation in-flight flag disagrees with workflow".into());
        }
        if self.unloading.is_some() != self.teardowns.is_in_flight() {
            return Err("teardown in-flight flag disagrees with pending unload".into());
        }
        Ok(())
    }
}
