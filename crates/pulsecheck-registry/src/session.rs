//! Session types: one instructor-led feedback room and the reverse-index
//! entry that ties a connection back to it.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use pulsecheck_protocol::{Aggregate, FeedbackLevel, SessionCode};
use pulsecheck_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Role / Membership
// ---------------------------------------------------------------------------

/// What a connection is doing in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Created the session. Never counted in the aggregate.
    Teacher,
    /// Joined with the code and reports a feedback level.
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => f.write_str("teacher"),
            Role::Student => f.write_str("student"),
        }
    }
}

/// Reverse-index entry: which session a connection belongs to, and how.
///
/// Exists exactly while the connection is part of a session, so a
/// disconnect can be resolved without scanning every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub code: SessionCode,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A live feedback session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The code students use to join. Unique among active sessions.
    pub code: SessionCode,

    /// The instructor's connection. Never present in `participants`.
    pub owner: ConnectionId,

    /// Every student connection and its current level.
    pub participants: HashMap<ConnectionId, FeedbackLevel>,

    /// When the session was opened. Informational only; nothing expires
    /// sessions today.
    pub created_at: Instant,
}

impl Session {
    pub(crate) fn new(code: SessionCode, owner: ConnectionId) -> Self {
        Self {
            code,
            owner,
            participants: HashMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Counts participants per level in a single pass.
    pub fn aggregate(&self) -> Aggregate {
        self.participants.values().copied().collect()
    }

    /// Returns `true` if `conn` is a student in this session.
    pub fn has_participant(&self, conn: ConnectionId) -> bool {
        self.participants.contains_key(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty_session_is_all_zero() {
        let session = Session::new(SessionCode::new("AB23CD"), ConnectionId::new(1));
        assert_eq!(session.aggregate(), Aggregate::default());
    }

    #[test]
    fn test_aggregate_excludes_owner() {
        let mut session =
            Session::new(SessionCode::new("AB23CD"), ConnectionId::new(1));
        session
            .participants
            .insert(ConnectionId::new(2), FeedbackLevel::Confused);

        let agg = session.aggregate();

        assert_eq!(agg.confused, 1);
        assert_eq!(agg.total, 1);
        assert!(!session.has_participant(ConnectionId::new(1)));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Teacher.to_string(), "teacher");
        assert_eq!(Role::Student.to_string(), "student");
    }
}
