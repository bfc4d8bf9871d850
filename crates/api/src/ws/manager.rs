use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use elicit_core::live_events::LiveEvent;
use elicit_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            let open_for = chrono::Utc::now() - conn.connected_at;
            tracing::debug!(conn_id, secs = open_for.num_seconds(), "Connection removed");
        }
    }

    /// Send a message to every connected client.
    ///
    /// A failed send to one connection never stops delivery to the others.
    /// Connections whose channel is closed are dropped after the fan-out.
    pub async fn broadcast(&self, message: Message) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();

        {
            let conns = self.connections.read().await;
            for (conn_id, conn) in conns.iter() {
                match conn.sender.send(message.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(_) => {
                        tracing::debug!(conn_id = %conn_id, "Broadcast to closed connection");
                        report.failed += 1;
                        dead.push(conn_id.clone());
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut conns = self.connections.write().await;
            for conn_id in &dead {
                conns.remove(conn_id);
            }
            tracing::info!(pruned = dead.len(), "Pruned closed WebSocket connections");
        }

        report
    }

    /// Serialize a [`LiveEvent`] and broadcast it as a text frame.
    pub async fn broadcast_event(&self, event: &LiveEvent) -> BroadcastReport {
        let report = self.broadcast(Message::Text(event.to_json().into())).await;
        tracing::debug!(
            event = event.event_type(),
            delivered = report.delivered,
            failed = report.failed,
            "Live event broadcast",
        );
        report
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
