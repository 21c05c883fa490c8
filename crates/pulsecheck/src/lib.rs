//! # Pulsecheck
//!
//! Live classroom feedback server.
//!
//! An instructor opens a session and shares its six-character code;
//! students join with the code and pick how well they are following
//! (got it, neutral, confused, lost). Whenever the roster or anyone's
//! level changes, everyone in the session receives fresh counts.
//!
//! - [`Coordinator`]: applies client events to the registry and fans
//!   results out to the session's connections
//! - [`PulsecheckServer`]: WebSocket accept loop around the coordinator
//! - [`ServerConfig`]: bind address, allowed origin, feedback interval
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsecheck::prelude::*;
//!
//! # async fn run() -> Result<(), PulsecheckError> {
//! let server = PulsecheckServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod fanout;
mod handler;
mod server;
mod throttle;

pub use config::{
    ConfigError, DEFAULT_FEEDBACK_INTERVAL, DEFAULT_PORT, ServerConfig,
};
pub use coordinator::{Coordinator, SESSION_NOT_FOUND, UNABLE_TO_JOIN};
pub use error::PulsecheckError;
pub use fanout::{Fanout, Outbox};
pub use server::{PulsecheckServer, PulsecheckServerBuilder};
pub use throttle::FeedbackThrottle;

/// Everything needed to run a server or drive a coordinator.
pub mod prelude {
    pub use crate::{
        ConfigError, Coordinator, PulsecheckError, PulsecheckServer,
        PulsecheckServerBuilder, ServerConfig,
    };
    pub use pulsecheck_protocol::{
        Aggregate, ClientEvent, FeedbackLevel, ServerEvent, SessionCode,
    };
    pub use pulsecheck_registry::{Role, SessionRegistry};
    pub use pulsecheck_transport::ConnectionId;
}
