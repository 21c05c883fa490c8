//! Wire protocol for Pulsecheck.
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`FeedbackLevel`],
//!   [`SessionCode`], [`Aggregate`]): what travels between browser and
//!   server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Registry (session state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Aggregate, ClientEvent, FeedbackLevel, ServerEvent, SessionCode,
};
