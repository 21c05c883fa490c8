//! Codec trait and implementations for serializing/deserializing events.
//!
//! The coordinator never touches bytes directly: it hands events to a
//! [`Codec`] and gets bytes back. [`JsonCodec`] is the only codec today,
//! since browser clients speak JSON.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task for the lifetime of the server.
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

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use pulsecheck_protocol::{Codec, JsonCodec, ServerEvent, SessionCode};
///
/// let codec = JsonCodec;
/// let event = ServerEvent::SessionCreated {
///     code: SessionCode::normalize("ab23cd"),
/// };
///
/// let bytes = codec.encode(&event).unwrap();
/// assert_eq!(
///     std::str::from_utf8(&bytes).unwrap(),
///     r#"{"event":"session-created","data":{"code":"AB23CD"}}"#,
/// );
///
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
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
    use crate::{Aggregate, ClientEvent};

    #[test]
    fn test_decode_join_session_from_client_json() {
        let raw = br#"{"event":"join-session","data":{"code":" ab23cd "}}"#;
        let event: ClientEvent = JsonCodec.decode(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinSession {
                code: " ab23cd ".into()
            }
        );
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_event_returns_decode_error() {
        let raw = br#"{"event":"self-destruct","data":{}}"#;
        let result: Result<ClientEvent, _> = JsonCodec.decode(raw);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_aggregate_produces_flat_counts() {
        let agg = Aggregate {
            gotit: 1,
            neutral: 2,
            confused: 0,
            lost: 3,
            total: 6,
        };
        let bytes = JsonCodec.encode(&agg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["gotit"], 1);
        assert_eq!(value["lost"], 3);
        assert_eq!(value["total"], 6);
    }
}
