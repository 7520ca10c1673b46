use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tandem_core::{Role, RoomCode, SignalMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A participant talking raw JSON frames to a running signaling server.
pub struct TestClient {
    /// Label used in logs.
    pub name: String,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Open a WebSocket to `/ws` on the given server.
    pub async fn connect(addr: SocketAddr, name: &str) -> Result<Self> {
        let url = format!("ws://{}/ws", addr);
        let (ws, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect {} to {}", name, url))?;
        tracing::debug!("[TestClient] {} connected", name);
        Ok(Self {
            name: name.to_string(),
            ws,
        })
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn send_signal(&mut self, message: &SignalMessage) -> Result<()> {
        let text = message.to_json()?;
        self.send_text(&text).await
    }

    pub async fn join(&mut self, code: &RoomCode, role: Role) -> Result<()> {
        self.send_signal(&SignalMessage::join_room(code.clone(), role)).await
    }

    /// Next text frame as JSON, or an error if none arrives in time or the
    /// socket closes first.
    pub async fn recv_json(&mut self, timeout_ms: u64) -> Result<Value> {
        match self.next_text(timeout_ms).await? {
            Some(text) => serde_json::from_str(&text).context("Server sent invalid JSON"),
            None => anyhow::bail!("{}: socket closed while waiting for a frame", self.name),
        }
    }

    /// Reads the next frame and checks its `type`.
    pub async fn expect_type(&mut self, kind: &str, timeout_ms: u64) -> Result<Value> {
        let frame = self.recv_json(timeout_ms).await?;
        anyhow::ensure!(
            frame["type"] == kind,
            "{}: expected {} frame, got {}",
            self.name,
            kind,
            frame
        );
        Ok(frame)
    }

    /// Succeeds if no text frame arrives within the window.
    pub async fn expect_silence(&mut self, window_ms: u64) -> Result<()> {
        match tokio::time::timeout(Duration::from_millis(window_ms), self.ws.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => {
                anyhow::bail!("{}: unexpected frame {}", self.name, text.as_str())
            }
            Ok(_) => Ok(()),
        }
    }

    /// True once the server has closed the socket.
    pub async fn wait_closed(&mut self, timeout_ms: u64) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Ok(false),
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return Ok(true),
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        tracing::debug!("[TestClient] {} closing", self.name);
        self.ws.close(None).await.context("Failed to close socket")
    }

    async fn next_text(&mut self, timeout_ms: u64) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .with_context(|| format!("{}: timeout waiting for a frame", self.name))?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_string())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e).context("WebSocket error"),
            }
        }
    }
}
