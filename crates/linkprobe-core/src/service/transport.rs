//! WebSocket transport to the controller.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Upper bound on a single connect attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect failures and unexpected closes. Recovered by reconnecting, never
/// reported to the controller.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
}

/// One open connection. `closed` is set as soon as the stream ends or a send
/// fails, so the watchdog can see it before the read side reports anything.
pub struct Transport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl Transport {
    pub async fn connect(url: String, timeout: Duration) -> Result<Self, TransportError> {
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        Ok(Self { ws, closed: false })
    }

    /// Next text frame. `None` once the peer has closed the connection.
    /// Control and binary frames are skipped.
    pub async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    pub async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if let Err(e) = self.ws.send(Message::Text(text)).await {
            self.closed = true;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub async fn close(&mut self) {
        let _ = self.ws.close(None).await;
        self.closed = true;
    }
}
