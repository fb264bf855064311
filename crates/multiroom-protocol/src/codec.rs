//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The protocol layer does not care how an [`Envelope`](crate::Envelope)
//! becomes bytes, only that something implements [`Codec`]. The server is
//! generic over it, so a binary codec can replace [`JsonCodec`] without
//! touching the coordinator.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Human-readable, so frames can be inspected in browser DevTools or
/// logged as-is. Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use multiroom_protocol::{ClientMessage, Codec, Envelope, JoinRoomMessage, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope {
///     seq: 1,
///     payload: ClientMessage::JoinRoom(JoinRoomMessage { room_name: "Arena".into() }),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<ClientMessage> = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, Envelope, ServerMessage, SpaceTransitionNotification};

    #[test]
    fn test_json_codec_decodes_client_frame() {
        let raw = br#"{ "seq": 7, "payload": { "type": "RoomListRequest" } }"#;
        let env: Envelope<ClientMessage> = JsonCodec.decode(raw).unwrap();
        assert_eq!(env.seq, 7);
        assert_eq!(env.payload, ClientMessage::RoomListRequest);
    }

    #[test]
    fn test_json_codec_encodes_server_frame() {
        let env = Envelope {
            seq: 1,
            payload: ServerMessage::SpaceTransition(SpaceTransitionNotification::load_additive(
                "Arena",
            )),
        };
        let bytes = JsonCodec.encode(&env).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["payload"]["spaceIdentifier"], "Arena");
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<Envelope<ClientMessage>, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_missing_payload_is_decode_error() {
        let result: Result<Envelope<ClientMessage>, _> = JsonCodec.decode(br#"{ "seq": 1 }"#);
        assert!(result.is_err());
    }
}
