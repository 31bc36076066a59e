//! Client connection management
//! Handles the outbound side of a single client connection

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::codec::LineCodec;
use crate::core::message::ServerMessage;

/// Cloneable handle to one live client connection. The line sender feeds
/// the connection's single writer task; the shutdown sender force-closes
/// the connection (session supersede, account deletion).
#[derive(Debug, Clone)]
pub struct Connection {
    pub conn_id: Uuid,
    sender: mpsc::UnboundedSender<String>,
    shutdown: mpsc::UnboundedSender<()>,
    pub connected_at: Instant,
}

impl Connection {
    /// Create a new connection handle with a unique ID
    pub fn new(sender: mpsc::UnboundedSender<String>, shutdown: mpsc::UnboundedSender<()>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            sender,
            shutdown,
            connected_at: Instant::now(),
        }
    }

    /// Send one protocol message through this connection. Returns false if
    /// the connection is gone; callers treat that as a dead handle.
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        let line = match LineCodec::encode(message) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode message for client {}: {}", self.conn_id, e);
                return false;
            }
        };

        match self.sender.send(line) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message to client {}", self.conn_id);
                false
            }
        }
    }

    /// Ask the owning connection task to close. Queued outbound lines are
    /// still flushed before the socket shuts down.
    pub fn close(&self) {
        let _ = self.shutdown.send(());
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
