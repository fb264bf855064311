//! # Multiroom
//!
//! Multi-room session coordination for networked games.
//!
//! Clients connect over WebSocket, list the active rooms, create a named
//! room (which loads an isolated *space* for it) or join an existing one.
//! Room creation and space teardown are serialized so that two clients
//! racing for the same room name can never both win, and spaces are
//! unloaded as soon as their room empties.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use multiroom::prelude::*;
//!
//! # async fn run() -> Result<(), MultiroomError> {
//! let loader = Arc::new(MemorySpaceLoader::new(["Arena"]));
//! let server = MultiroomServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(loader, LogPlacement)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::MultiroomError;
pub use server::{MultiroomServer, MultiroomServerBuilder, ServerConfig};

pub use multiroom_protocol as protocol;
pub use multiroom_room as room;
pub use multiroom_session as session;
pub use multiroom_tick as tick;
pub use multiroom_transport as transport;

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{MultiroomError, MultiroomServer, MultiroomServerBuilder, ServerConfig};

    pub use multiroom_protocol::{
        ClientMessage, Codec, CreateRoomFailed, CreateRoomMessage, Envelope, JoinRoomMessage,
        JsonCodec, ProtocolError, RoomListEntry, RoomListResponse, ServerMessage,
        SpaceOperation, SpaceTransitionNotification,
    };
    pub use multiroom_room::{
        CoordinatorConfig, CoordinatorHandle, EntityKind, EntityPlacement, LogPlacement,
        MemorySpaceLoader, RoomError, RoomSummary, SpaceError, SpaceHandle, SpaceLoader,
        spawn_coordinator,
    };
    pub use multiroom_session::SessionError;
    pub use multiroom_tick::TickConfig;
    pub use multiroom_transport::{ConnectionId, TransportError};
}
