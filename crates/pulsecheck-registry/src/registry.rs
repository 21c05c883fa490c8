//! The session registry: every active session and who is in it.
//!
//! Two maps are kept in lockstep:
//!
//! - `sessions`: code → [`Session`] (forward map, owns the rosters)
//! - `members`: connection → [`Membership`] (reverse index)
//!
//! Every operation that touches one updates the other before returning,
//! so a connection has a membership exactly when it is the owner or a
//! participant of the session that membership names.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain data structure with `&mut self`
//! mutators. The server keeps it behind a single mutex so each inbound
//! event is applied atomically.

use std::collections::HashMap;

use pulsecheck_protocol::{Aggregate, FeedbackLevel, SessionCode};
use pulsecheck_transport::ConnectionId;
use rand::Rng;

use crate::{Membership, RegistryError, Role, Session};

/// Symbols used in generated codes. No `0`/`O` or `1`/`I`, so a code read
/// off a projector can't be mistyped.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of every generated code.
pub const CODE_LENGTH: usize = 6;

/// All active sessions, plus the reverse index from connections to them.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionCode, Session>,
    members: HashMap<ConnectionId, Membership>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session owned by `owner` and returns its code.
    ///
    /// Never fails: with 32^6 possible codes, collisions are rare and
    /// simply trigger another draw.
    pub fn create_session(&mut self, owner: ConnectionId) -> SessionCode {
        self.create_session_with(owner, &mut rand::rng())
    }

    /// Like [`create_session`](Self::create_session), drawing the code
    /// from the given random source.
    pub fn create_session_with<R: Rng + ?Sized>(
        &mut self,
        owner: ConnectionId,
        rng: &mut R,
    ) -> SessionCode {
        // A connection belongs to one session at a time.
        self.remove_socket(owner);

        let code = loop {
            let candidate = generate_code(rng);
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(code = %candidate, "session code collision, redrawing");
        };

        self.sessions
            .insert(code.clone(), Session::new(code.clone(), owner));
        self.members.insert(
            owner,
            Membership {
                code: code.clone(),
                role: Role::Teacher,
            },
        );

        tracing::info!(%code, %owner, "session created");
        code
    }

    /// Returns `true` if a session with exactly this code is active.
    ///
    /// Callers normalize user input first (see [`SessionCode::normalize`]).
    pub fn session_exists(&self, code: &SessionCode) -> bool {
        self.sessions.contains_key(code)
    }

    /// Adds `conn` to the session as a student at the default level.
    ///
    /// Joining again under the same connection resets the level to
    /// neutral. If the connection was in a different session, it is
    /// removed from that one first.
    ///
    /// # Errors
    /// - [`RegistryError::SessionNotFound`]: no such session
    /// - [`RegistryError::OwnerCannotJoin`]: `conn` created this session
    pub fn add_student(
        &mut self,
        code: &SessionCode,
        conn: ConnectionId,
    ) -> Result<(), RegistryError> {
        let owner = self
            .sessions
            .get(code)
            .map(|s| s.owner)
            .ok_or_else(|| RegistryError::SessionNotFound(code.clone()))?;
        if owner == conn {
            return Err(RegistryError::OwnerCannotJoin(conn, code.clone()));
        }

        if self
            .members
            .get(&conn)
            .is_some_and(|m| &m.code != code)
        {
            self.remove_socket(conn);
        }

        let session = self
            .sessions
            .get_mut(code)
            .ok_or_else(|| RegistryError::SessionNotFound(code.clone()))?;
        session
            .participants
            .insert(conn, FeedbackLevel::default());
        self.members.insert(
            conn,
            Membership {
                code: code.clone(),
                role: Role::Student,
            },
        );

        tracing::info!(
            %code,
            %conn,
            students = session.participants.len(),
            "student joined"
        );
        Ok(())
    }

    /// Sets a student's current feedback level.
    ///
    /// Only connections that are participants of this exact session may
    /// update it, so a socket outside the room can't skew the counts.
    ///
    /// # Errors
    /// - [`RegistryError::SessionNotFound`]: no such session
    /// - [`RegistryError::NotAParticipant`]: `conn` isn't a student here
    pub fn update_feedback(
        &mut self,
        code: &SessionCode,
        conn: ConnectionId,
        level: FeedbackLevel,
    ) -> Result<(), RegistryError> {
        let session = self
            .sessions
            .get_mut(code)
            .ok_or_else(|| RegistryError::SessionNotFound(code.clone()))?;
        let slot = session
            .participants
            .get_mut(&conn)
            .ok_or_else(|| RegistryError::NotAParticipant(conn, code.clone()))?;
        *slot = level;

        tracing::debug!(%code, %conn, %level, "feedback updated");
        Ok(())
    }

    /// Returns the current counts for a session, or `None` if it's gone.
    pub fn aggregate(&self, code: &SessionCode) -> Option<Aggregate> {
        self.sessions.get(code).map(Session::aggregate)
    }

    /// Forgets a connection, returning the membership it had.
    ///
    /// Students are also dropped from their session's roster. A departing
    /// teacher leaves the session and its roster untouched: the session
    /// stays open until it is explicitly ended.
    pub fn remove_socket(&mut self, conn: ConnectionId) -> Option<Membership> {
        let membership = self.members.remove(&conn)?;

        if membership.role == Role::Student {
            if let Some(session) = self.sessions.get_mut(&membership.code) {
                session.participants.remove(&conn);
            }
        }

        tracing::info!(
            code = %membership.code,
            %conn,
            role = %membership.role,
            "connection left session"
        );
        Some(membership)
    }

    /// Closes a session and forgets everyone in it.
    ///
    /// # Errors
    /// Returns [`RegistryError::SessionNotFound`] if the session doesn't
    /// exist, including when it was already ended.
    pub fn end_session(&mut self, code: &SessionCode) -> Result<(), RegistryError> {
        let session = self
            .sessions
            .remove(code)
            .ok_or_else(|| RegistryError::SessionNotFound(code.clone()))?;

        // The owner may have moved on to another session since; only
        // drop entries that still point here.
        let members = std::iter::once(session.owner)
            .chain(session.participants.keys().copied());
        for conn in members {
            if self.members.get(&conn).is_some_and(|m| &m.code == code) {
                self.members.remove(&conn);
            }
        }

        tracing::info!(
            %code,
            students = session.participants.len(),
            "session ended"
        );
        Ok(())
    }

    /// Looks up a session by code.
    pub fn session(&self, code: &SessionCode) -> Option<&Session> {
        self.sessions.get(code)
    }

    /// Looks up which session a connection is part of.
    pub fn membership(&self, conn: ConnectionId) -> Option<&Membership> {
        self.members.get(&conn)
    }

    /// Returns the number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no active sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Draws one candidate code: `CODE_LENGTH` independent, uniform picks
/// from `CODE_ALPHABET`.
fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> SessionCode {
    let code: String = (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect();
    SessionCode::new(code)
}

// =========================================================================
// Tests
// =========================================================================
