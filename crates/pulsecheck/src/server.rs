//! `PulsecheckServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → coordinator →
//! registry.

use std::sync::Arc;
use std::time::Duration;

use pulsecheck_protocol::{Codec, JsonCodec};
use pulsecheck_registry::SessionRegistry;
use pulsecheck_transport::{PendingHandshake, WebSocketTransport};
use tokio::sync::Mutex;

use crate::PulsecheckError;
use crate::config::ServerConfig;
use crate::coordinator::Coordinator;
use crate::handler::handle_connection;

/// How long a client gets to finish the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection task.
///
/// The coordinator sits behind a single mutex: every inbound event and
/// every disconnect is applied while holding it, which keeps the
/// registry's two maps consistent under concurrent connections.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Mutex<Coordinator>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Pulsecheck server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), pulsecheck::PulsecheckError> {
/// use pulsecheck::prelude::*;
///
/// let server = PulsecheckServer::builder()
///     .bind("127.0.0.1:3001")
///     .allowed_origin("http://localhost:5173")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PulsecheckServerBuilder {
    config: ServerConfig,
    registry: SessionRegistry,
}

impl PulsecheckServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: SessionRegistry::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Only accept browser connections from this origin.
    pub fn allowed_origin(mut self, origin: &str) -> Self {
        self.config.allowed_origin = Some(origin.to_string());
        self
    }

    /// Sets the minimum spacing between accepted feedback events.
    pub fn feedback_interval(mut self, interval: Duration) -> Self {
        self.config.feedback_interval = interval;
        self
    }

    /// Starts from a prepared registry instead of an empty one.
    pub fn registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<PulsecheckServer<JsonCodec>, PulsecheckError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_allowed_origin(self.config.allowed_origin.clone());

        let state = Arc::new(ServerState {
            coordinator: Mutex::new(Coordinator::new(
                self.registry,
                self.config.feedback_interval,
            )),
            codec: JsonCodec,
        });

        Ok(PulsecheckServer { transport, state })
    }
}

impl Default for PulsecheckServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Pulsecheck server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PulsecheckServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl PulsecheckServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PulsecheckServerBuilder {
        PulsecheckServerBuilder::new()
    }
}

impl<C: Codec> PulsecheckServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each TCP connection is upgraded on its own task, so a client that
    /// never finishes its handshake doesn't hold up the next one. Failed
    /// handshakes (including rejected origins) are logged and dropped.
    pub async fn run(mut self) -> Result<(), PulsecheckError> {
        tracing::info!("Pulsecheck server running");

        loop {
            match self.transport.accept_pending().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(serve(pending, state));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Upgrades one pending connection and runs its handler to completion.
async fn serve<C: Codec>(pending: PendingHandshake, state: Arc<ServerState<C>>) {
    let peer = pending.peer_addr();
    let conn = match tokio::time::timeout(HANDSHAKE_TIMEOUT, pending.complete()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::debug!(%peer, "handshake timed out");
            return;
        }
    };

    if let Err(e) = handle_connection(conn, state).await {
        tracing::debug!(error = %e, "connection ended with error");
    }
}
