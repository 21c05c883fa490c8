//! Wire types for Pulsecheck.
//!
//! Every event is an adjacently tagged JSON object:
//!
//! ```text
//! { "event": "join-session", "data": { "code": "AB23CD" } }
//! { "event": "session-ended" }
//! ```
//!
//! Inbound events are [`ClientEvent`], outbound events are
//! [`ServerEvent`]. Client-supplied codes and levels stay as raw strings
//! here; normalizing and validating them is the coordinator's decision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// SessionCode
// ---------------------------------------------------------------------------

/// The short code students type (or scan) to join a session.
///
/// Serialized as a plain string. Codes produced by the registry are six
/// characters from an alphabet without look-alike symbols; codes built
/// from client input are only normalized, not validated, so an unknown
/// code simply fails to match any session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Wraps an already-canonical code without touching it.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Builds a code from user input: surrounding whitespace is trimmed
    /// and letters are uppercased, so `" ab23cd\n"` matches `AB23CD`.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FeedbackLevel
// ---------------------------------------------------------------------------

/// How well a student says they are following.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackLevel {
    #[serde(alias = "gotit")]
    GotIt,
    /// Every student starts here on join.
    #[default]
    Neutral,
    Confused,
    Lost,
}

impl FeedbackLevel {
    /// All levels, in display order.
    pub const ALL: [FeedbackLevel; 4] = [
        FeedbackLevel::GotIt,
        FeedbackLevel::Neutral,
        FeedbackLevel::Confused,
        FeedbackLevel::Lost,
    ];

    /// The wire name of this level.
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackLevel::GotIt => "got-it",
            FeedbackLevel::Neutral => "neutral",
            FeedbackLevel::Confused => "confused",
            FeedbackLevel::Lost => "lost",
        }
    }
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackLevel {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "got-it" | "gotit" => Ok(FeedbackLevel::GotIt),
            "neutral" => Ok(FeedbackLevel::Neutral),
            "confused" => Ok(FeedbackLevel::Confused),
            "lost" => Ok(FeedbackLevel::Lost),
            other => Err(ProtocolError::InvalidLevel(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Per-session counts of each feedback level.
///
/// `total` counts students only; the instructor is never a participant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct Aggregate {
    pub gotit: usize,
    pub neutral: usize,
    pub confused: usize,
    pub lost: usize,
    pub total: usize,
}

impl Aggregate {
    /// Counts one participant at the given level.
    pub fn record(&mut self, level: FeedbackLevel) {
        match level {
            FeedbackLevel::GotIt => self.gotit += 1,
            FeedbackLevel::Neutral => self.neutral += 1,
            FeedbackLevel::Confused => self.confused += 1,
            FeedbackLevel::Lost => self.lost += 1,
        }
        self.total += 1;
    }
}

impl FromIterator<FeedbackLevel> for Aggregate {
    fn from_iter<I: IntoIterator<Item = FeedbackLevel>>(iter: I) -> Self {
        let mut agg = Aggregate::default();
        for level in iter {
            agg.record(level);
        }
        agg
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Instructor: "open a new session for me."
    CreateSession,

    /// Student: "put me in this session."
    JoinSession { code: String },

    /// Student: "this is how I'm doing now."
    Feedback { code: String, level: String },

    /// Instructor: "close this session for everyone."
    EndSession { code: String },
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// To the creator only.
    SessionCreated { code: SessionCode },

    /// To the joiner only.
    JoinedSession { code: SessionCode },

    /// To the joiner only, with a human-readable reason.
    JoinError { message: String },

    /// To every connection in the session's group.
    AggregateUpdate(Aggregate),

    /// To every connection in the session's group.
    SessionEnded,
}

// =========================================================================
// Tests
// =========================================================================
