//! Wire protocol for Multiroom.
//!
//! This crate defines the messages clients and the room coordinator
//! exchange, and how they are turned into bytes:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Envelope`]):
//!   the shapes of room list, create, join and space transition messages.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): encoding to and from bytes.
//! - **Errors** ([`ProtocolError`]): malformed or inconsistent frames.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room coordinator
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, CreateRoomFailed, CreateRoomMessage, Envelope, JoinRoomMessage,
    RoomListEntry, RoomListResponse, ServerMessage, SpaceOperation,
    SpaceTransitionNotification,
};
