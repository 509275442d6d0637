//! Error types for the protocol layer.
//!
//! Each Inkling crate defines its own error enum. A `ProtocolError` always
//! means the bytes or their shape were wrong, never that a room refused an
//! action.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown event name.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates protocol rules, e.g. a room code
    /// with characters outside the room-code alphabet.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
