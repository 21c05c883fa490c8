//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or interpreting
/// wire events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name,
    /// or a payload missing required fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The string is not one of the four feedback levels.
    #[error("invalid feedback level: {0:?}")]
    InvalidLevel(String),
}
