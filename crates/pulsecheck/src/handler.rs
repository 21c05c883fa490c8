//! Per-connection handler: decode inbound events, pump outbound ones.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound channel with the coordinator
//!   2. Loop: inbound frame → decode → coordinator, or
//!      outbound event → encode → socket
//!   3. On exit (clean close, error, or panic) the guard runs the
//!      coordinator's disconnect path

use std::sync::Arc;

use pulsecheck_protocol::{ClientEvent, Codec};
use pulsecheck_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::PulsecheckError;
use crate::server::ServerState;

/// Drop guard that disconnects a connection from the coordinator when
/// the handler exits.
///
/// `Drop` is synchronous, so the async lock is taken in a spawned task.
struct DisconnectGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.lock().await.disconnect(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PulsecheckError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, mut outbound) = mpsc::unbounded_channel();
    state.coordinator.lock().await.connect(conn_id, outbox);
    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                let event: ClientEvent = match state.codec.decode(&data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(
                            %conn_id, error = %e, "failed to decode event"
                        );
                        continue;
                    }
                };

                state.coordinator.lock().await.handle(conn_id, event);
            }

            Some(event) = outbound.recv() => {
                let bytes = state.codec.encode(&event)?;
                conn.send(&bytes).await?;
            }
        }
    }

    // _guard drops here → disconnect fires.
    Ok(())
}
