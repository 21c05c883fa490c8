//! Unified error type for the Pulsecheck server.

use pulsecheck_protocol::ProtocolError;
use pulsecheck_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps the crate-specific errors.
///
/// Registry refusals never show up here: the coordinator turns them into
/// client-facing events or drops them.
#[derive(Debug, thiserror::Error)]
pub enum PulsecheckError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The environment didn't yield a usable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::AcceptFailed(std::io::Error::other("gone"));
        let top: PulsecheckError = err.into();
        assert!(matches!(top, PulsecheckError::Transport(_)));
        assert!(top.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidLevel("meh".into());
        let top: PulsecheckError = err.into();
        assert!(matches!(top, PulsecheckError::Protocol(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::InvalidPort("x".into());
        let top: PulsecheckError = err.into();
        assert!(matches!(top, PulsecheckError::Config(_)));
        assert!(top.to_string().contains("PORT"));
    }
}
