//! Lightweight JSON-RPC WebSocket client for CLI commands and the TUI.
//!
//! CLI subcommands (`taskd status`, `taskd task …`) use this to connect to
//! the running daemon and call RPC methods with authentication.

pub mod cache;

use anyhow::{Context as _, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A short-lived WebSocket client for client-to-daemon RPC calls.
pub struct TaskClient {
    url: String,
    port: u16,
    token: String,
}

impl TaskClient {
    /// Create a client targeting the daemon on the given port with the given auth token.
    pub fn new(port: u16, token: String) -> Self {
        let url = format!("ws://127.0.0.1:{port}");
        Self { url, port, token }
    }

    /// Check if the daemon is reachable (3-second timeout).
    pub async fn is_reachable(&self) -> bool {
        let connect = connect_async(&self.url);
        matches!(
            tokio::time::timeout(std::time::Duration::from_secs(3), connect).await,
            Ok(Ok(_))
        )
    }

    /// Connect, authenticate, call one RPC method, and return the result.
    ///
    /// Uses a 5-second timeout for both connection and the RPC call.
    pub async fn call_once(&self, method: &str, params: Value) -> Result<Value> {
        let timeout = std::time::Duration::from_secs(5);
        let (mut ws, _) = tokio::time::timeout(timeout, connect_async(&self.url))
            .await
            .context("timed out connecting to daemon")?
            .context("failed to connect to daemon WebSocket")?;

        authenticate(&mut ws, &self.token).await?;

        let req = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": method,
            "params": params
        });
        ws.send(Message::Text(serde_json::to_string(&req).unwrap()))
            .await?;

        read_response(&mut ws, 2).await
    }

    /// Port the client is targeting.
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Connect and run the `daemon.auth` handshake on an open stream.
pub async fn authenticate(ws: &mut WsStream, token: &str) -> Result<()> {
    let auth_req = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "daemon.auth",
        "params": { "token": token }
    });
    ws.send(Message::Text(serde_json::to_string(&auth_req).unwrap()))
        .await?;
    read_response(ws, 1).await?;
    Ok(())
}

/// Read messages until the response with the given `id` arrives, skipping
/// notifications. 5-second timeout per read.
pub async fn read_response(ws: &mut WsStream, id: u64) -> Result<Value> {
    let timeout = std::time::Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout(timeout, ws.next())
            .await
            .context("timed out waiting for daemon response")?
            .context("WebSocket stream ended")?
            .context("WebSocket error")?;

        if let Message::Text(text) = msg {
            let v: Value = serde_json::from_str(&text)?;
            if v.get("id").and_then(|x| x.as_u64()) == Some(id) {
                if let Some(err) = v.get("error") {
                    anyhow::bail!("daemon RPC error: {err}");
                }
                return Ok(v["result"].clone());
            }
            // else: notification — skip and read next
        }
    }
}
