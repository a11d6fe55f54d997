//! Minimal WebSocket controller for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

pub type ControllerSocket = WebSocketStream<TcpStream>;

/// Generous bound for any single step of a test.
pub const STEP: Duration = Duration::from_secs(5);

pub struct Controller {
    listener: TcpListener,
    pub addr: SocketAddr,
}

impl Controller {
    pub async fn bind() -> Self {
        Self::bind_addr("127.0.0.1:0".parse().unwrap()).await
    }

    pub async fn bind_addr(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self { listener, addr }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait for the service to connect and complete the handshake.
    pub async fn accept(&self) -> ControllerSocket {
        let fut = async {
            let (stream, _) = self.listener.accept().await.unwrap();
            accept_async(stream).await.unwrap()
        };
        tokio::time::timeout(STEP, fut)
            .await
            .expect("service did not connect")
    }
}

pub async fn send_json(ws: &mut ControllerSocket, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

pub async fn send_raw(ws: &mut ControllerSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

/// Next text frame, parsed as JSON.
pub async fn recv_json(ws: &mut ControllerSocket) -> Value {
    let fut = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    };
    tokio::time::timeout(STEP, fut)
        .await
        .expect("no message from service")
}
