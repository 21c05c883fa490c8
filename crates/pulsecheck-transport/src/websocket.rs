//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// When an allowed origin is configured, browser handshakes carrying a
/// different `Origin` header are refused with `403 Forbidden`. Clients
/// that send no `Origin` at all are let through.
pub struct WebSocketTransport {
    listener: TcpListener,
    allowed_origin: Option<String>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            allowed_origin: None,
        })
    }

    /// Restricts browser handshakes to a single origin.
    pub fn with_allowed_origin(mut self, origin: Option<String>) -> Self {
        self.allowed_origin = origin;
        self
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts the next TCP connection without upgrading it.
    ///
    /// The upgrade happens in [`PendingHandshake::complete`], which can
    /// run on its own task.
    pub async fn accept_pending(&mut self) -> Result<PendingHandshake, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingHandshake {
            stream,
            addr,
            allowed_origin: self.allowed_origin.clone(),
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.accept_pending().await?.complete().await
    }
}

/// A TCP connection that has not finished the WebSocket upgrade yet.
pub struct PendingHandshake {
    stream: TcpStream,
    addr: SocketAddr,
    allowed_origin: Option<String>,
}

impl PendingHandshake {
    /// Peer address of the underlying TCP connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Performs the upgrade, refusing foreign origins with `403`.
    pub async fn complete(self) -> Result<WebSocketConnection, TransportError> {
        let Self {
            stream,
            addr,
            allowed_origin,
        } = self;

        let check_origin = move |request: &Request, response: Response| {
            let origin = request
                .headers()
                .get("Origin")
                .and_then(|value| value.to_str().ok());
            if origin_allowed(allowed_origin.as_deref(), origin) {
                Ok(response)
            } else {
                tracing::warn!(?origin, "rejecting handshake from origin");
                Err(forbidden("origin not allowed"))
            }
        };

        let ws = tokio_tungstenite::accept_hdr_async(stream, check_origin)
            .await
            .map_err(|e| {
                TransportError::HandshakeFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

fn origin_allowed(allowed: Option<&str>, origin: Option<&str>) -> bool {
    match (allowed, origin) {
        (Some(allowed), Some(origin)) => {
            allowed.trim_end_matches('/') == origin.trim_end_matches('/')
        }
        _ => true,
    }
}

fn forbidden(message: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(message.to_string()));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
}

/// A single WebSocket connection.
///
/// The read and write halves are locked independently, so a task parked
/// in [`recv`](Connection::recv) never blocks an outbound send.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// JSON payloads go out as text frames; anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            let msg = stream.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_allowed_without_restriction_accepts_anything() {
        assert!(origin_allowed(None, Some("http://evil.example")));
        assert!(origin_allowed(None, None));
    }

    #[test]
    fn test_origin_allowed_matching_origin_accepts() {
        assert!(origin_allowed(
            Some("http://localhost:5173"),
            Some("http://localhost:5173"),
        ));
        assert!(origin_allowed(
            Some("http://localhost:5173/"),
            Some("http://localhost:5173"),
        ));
    }

    #[test]
    fn test_origin_allowed_other_origin_rejects() {
        assert!(!origin_allowed(
            Some("http://localhost:5173"),
            Some("http://localhost:3000"),
        ));
    }

    #[test]
    fn test_origin_allowed_missing_header_accepts() {
        assert!(origin_allowed(Some("http://localhost:5173"), None));
    }

    #[test]
    fn test_forbidden_sets_status_and_body() {
        let resp = forbidden("nope");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.body().as_deref(), Some("nope"));
    }
}
