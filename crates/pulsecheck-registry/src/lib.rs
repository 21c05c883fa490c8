//! In-memory session registry for Pulsecheck.
//!
//! The single source of truth for which feedback sessions exist, who
//! runs them, which students are in them, and what each student last
//! reported. No I/O and no knowledge of connections beyond their opaque
//! [`ConnectionId`](pulsecheck_transport::ConnectionId).
//!
//! ```text
//! Coordinator (above)  ← decides what to tell clients after each change
//!     ↕
//! Registry (this crate)  ← owns sessions, rosters, and the reverse index
//!     ↕
//! Protocol (below)  ← provides SessionCode, FeedbackLevel, Aggregate
//! ```

mod error;
mod registry;
mod session;

pub use error::RegistryError;
pub use registry::{CODE_ALPHABET, CODE_LENGTH, SessionRegistry};
pub use session::{Membership, Role, Session};
