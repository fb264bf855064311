//! Room lifecycle coordination for Multiroom.
//!
//! Clients browse named rooms, create a room (which loads an isolated
//! *space* for it), or join an existing one. This crate owns the state
//! behind that and keeps it consistent while space loads are in flight.
//!
//! # Key types
//!
//! - [`Coordinator`]: the synchronous core; every room state change goes
//!   through it
//! - [`spawn_coordinator`] / [`CoordinatorHandle`]: runs a coordinator in
//!   its own task together with a [`SpaceLoader`]
//! - [`RoomCatalog`] and [`ConnectionRoomIndex`]: who is where
//! - [`CreationSerializer`] and [`TeardownSerializer`]: one load and one
//!   unload at a time, in request order
//! - [`SpaceLoader`]: the asynchronous resource gateway
//! - [`EntityPlacement`]: entity side effects of entering a room
//!
//! # Guarantees
//!
//! - A connection occupies at most one room.
//! - Room names are unique among active rooms, even when two clients ask
//!   for the same name at once.
//! - A room's occupancy never exceeds its capacity.
//! - A room is removed from the catalog as soon as its last member leaves,
//!   and every loaded space is eventually unloaded.

mod actor;
mod catalog;
mod config;
mod coordinator;
mod error;
mod handler;
mod index;
mod placement;
mod queue;
mod space;
mod workflow;

pub use actor::{CoordinatorHandle, spawn_coordinator};
pub use catalog::{Room, RoomCatalog, RoomSummary};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorStats, SpaceCommand};
pub use error::RoomError;
pub use index::ConnectionRoomIndex;
pub use placement::{EntityKind, EntityPlacement, LogPlacement};
pub use queue::{
    CreationSerializer, PendingCreateRequest, PendingTeardown, SerialQueue, TeardownSerializer,
};
pub use space::{MemorySpaceLoader, SpaceError, SpaceHandle, SpaceLoader};
pub use workflow::{CreationState, CreationWorkflow, WorkflowId};
