//! Event coordinator: turns inbound client events into registry changes
//! and decides who hears about them.
//!
//! Every handler runs to completion without awaiting, so holding the
//! coordinator behind one mutex makes each event atomic with respect to
//! every other event.
//!
//! Failure policy:
//!
//! | Failure                          | Reaction                          |
//! |----------------------------------|-----------------------------------|
//! | join with an unknown code        | `join-error` to the requester     |
//! | join refused by the registry     | `join-error` to the requester     |
//! | feedback within the interval     | dropped silently                  |
//! | feedback with bad level/code     | dropped silently                  |
//! | feedback from a non-participant  | dropped silently                  |
//! | ending an unknown session        | `session-ended` still broadcast   |

use std::time::Duration;

use pulsecheck_protocol::{
    ClientEvent, FeedbackLevel, ServerEvent, SessionCode,
};
use pulsecheck_registry::{Role, SessionRegistry};
use pulsecheck_transport::ConnectionId;
use tokio::time::Instant;

use crate::fanout::{Fanout, Outbox};
use crate::throttle::FeedbackThrottle;

/// Shown to a student whose code matches no active session.
pub const SESSION_NOT_FOUND: &str = "Session not found";

/// Shown to a student the registry refused to add.
pub const UNABLE_TO_JOIN: &str = "Unable to join session";

/// Owns the registry and routes every event that touches it.
#[derive(Debug)]
pub struct Coordinator {
    registry: SessionRegistry,
    throttle: FeedbackThrottle,
    fanout: Fanout,
}

impl Coordinator {
    /// Wraps an existing registry.
    pub fn new(registry: SessionRegistry, feedback_interval: Duration) -> Self {
        Self {
            registry,
            throttle: FeedbackThrottle::new(feedback_interval),
            fanout: Fanout::new(),
        }
    }

    /// Read access to session state.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Registers a newly accepted connection's outbound channel.
    pub fn connect(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.fanout.register(conn, outbox);
        tracing::debug!(%conn, "connection registered");
    }

    /// Applies one inbound event from `conn`.
    pub fn handle(&mut self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::CreateSession => self.create_session(conn),
            ClientEvent::JoinSession { code } => self.join_session(conn, &code),
            ClientEvent::Feedback { code, level } => {
                self.feedback(conn, &code, &level, Instant::now())
            }
            ClientEvent::EndSession { code } => self.end_session(&code),
        }
    }

    /// Cleans up after a connection the transport reports as gone.
    ///
    /// Remaining students see the smaller roster. A departing instructor
    /// leaves the session open and nobody is notified.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        self.throttle.forget(conn);
        self.fanout.unregister(conn);
        self.leave_current(conn);
        tracing::debug!(%conn, "connection unregistered");
    }

    fn create_session(&mut self, conn: ConnectionId) {
        self.leave_current(conn);

        let code = self.registry.create_session(conn);
        self.fanout.subscribe(&code, conn);
        self.fanout.emit(conn, ServerEvent::SessionCreated { code });
    }

    fn join_session(&mut self, conn: ConnectionId, raw_code: &str) {
        let code = SessionCode::normalize(raw_code);
        if !self.registry.session_exists(&code) {
            tracing::debug!(%conn, %code, "join with unknown code");
            self.fanout.emit(
                conn,
                ServerEvent::JoinError {
                    message: SESSION_NOT_FOUND.to_string(),
                },
            );
            return;
        }

        // The registry releases any other membership only once the join
        // is accepted, so a refusal leaves the caller where it was.
        let previous = self
            .registry
            .membership(conn)
            .filter(|m| m.code != code)
            .cloned();

        if let Err(e) = self.registry.add_student(&code, conn) {
            tracing::debug!(%conn, error = %e, "join refused");
            self.fanout.emit(
                conn,
                ServerEvent::JoinError {
                    message: UNABLE_TO_JOIN.to_string(),
                },
            );
            return;
        }

        self.fanout.subscribe(&code, conn);
        if let Some(previous) = previous.filter(|m| m.role == Role::Student) {
            self.broadcast_aggregate(&previous.code);
        }
        self.fanout
            .emit(conn, ServerEvent::JoinedSession { code: code.clone() });
        self.broadcast_aggregate(&code);
    }

    fn feedback(
        &mut self,
        conn: ConnectionId,
        raw_code: &str,
        raw_level: &str,
        now: Instant,
    ) {
        if !self.throttle.admit(conn, now) {
            tracing::trace!(%conn, "feedback throttled");
            return;
        }

        let code = SessionCode::normalize(raw_code);
        let level = match raw_level.parse::<FeedbackLevel>() {
            Ok(level) => level,
            Err(e) => {
                tracing::debug!(%conn, error = %e, "feedback dropped");
                return;
            }
        };

        if let Err(e) = self.registry.update_feedback(&code, conn, level) {
            tracing::debug!(%conn, error = %e, "feedback dropped");
            return;
        }
        self.broadcast_aggregate(&code);
    }

    fn end_session(&mut self, raw_code: &str) {
        let code = SessionCode::normalize(raw_code);

        // Notify first so delivery doesn't depend on registry state.
        self.fanout.broadcast(&code, &ServerEvent::SessionEnded);

        if let Err(e) = self.registry.end_session(&code) {
            tracing::debug!(error = %e, "end of unknown session");
        }
        self.fanout.dissolve(&code);
    }

    /// Drops the connection's current membership, refreshing the counts
    /// of the session it leaves if it was a student there.
    fn leave_current(&mut self, conn: ConnectionId) {
        let Some(membership) = self.registry.remove_socket(conn) else {
            return;
        };
        self.fanout.leave(conn);
        if membership.role == Role::Student {
            self.broadcast_aggregate(&membership.code);
        }
    }

    /// Sends fresh counts to the whole group. Nothing is sent if the
    /// session has already been ended.
    fn broadcast_aggregate(&self, code: &SessionCode) {
        if let Some(aggregate) = self.registry.aggregate(code) {
            let reached = self
                .fanout
                .broadcast(code, &ServerEvent::AggregateUpdate(aggregate));
            tracing::trace!(%code, reached, "aggregate broadcast");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
