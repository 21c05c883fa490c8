//! Error types for the registry.

use pulsecheck_protocol::SessionCode;
use pulsecheck_transport::ConnectionId;

/// Why a registry operation was refused.
///
/// None of these are fatal. The coordinator decides whether a refusal
/// is reported to the client (failed join) or swallowed (feedback from
/// a stale client, ending a session twice).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No active session has this code.
    #[error("session {0} not found")]
    SessionNotFound(SessionCode),

    /// The connection is not a student in this session.
    #[error("{0} is not a participant of session {1}")]
    NotAParticipant(ConnectionId, SessionCode),

    /// The instructor tried to join their own session as a student.
    #[error("{0} owns session {1} and cannot join it as a student")]
    OwnerCannotJoin(ConnectionId, SessionCode),
}
