//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or the message shape were
//! wrong. Room-level rejections (full room, duplicate name) are not
//! protocol errors; they live in `multiroom-room`.

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a message).
    ///
    /// Common causes: malformed JSON, an unknown `"type"` tag, or a
    /// negative `maxPlayers`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but violates a protocol rule, such as a room
    /// list response whose parallel arrays differ in length.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
