//! Per-connection client handler
//! Owns the read loop, the writer task, and disconnect cleanup

use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::core::codec::LineCodec;
use crate::core::connection::Connection;
use crate::core::dispatcher::{ClientSession, Flow, RequestDispatcher, SessionState};
use crate::core::session::{broadcast_presence, lock_sessions};

/// Drive one client connection to completion. Spawned once per accepted
/// connection; returning tears the connection down.
pub async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<RequestDispatcher>,
    buffer_size: usize,
    read_timeout: Duration,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();

    // Single writer task per connection: one write_all per record, so
    // concurrent senders never interleave partial lines. Draining the
    // channel before shutdown flushes responses queued right before close.
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let conn = Connection::new(tx, shutdown_tx);
    let mut session = ClientSession::new(conn, peer);
    let mut codec = LineCodec::with_capacity(buffer_size);

    info!("Client connected: {} ({})", session.conn.conn_id, peer);

    'connection: loop {
        // Drain every complete record before reading more bytes
        while let Some(request) = codec.next_request() {
            match dispatcher.dispatch(&mut session, request).await {
                Flow::Continue => {}
                Flow::Close => break 'connection,
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Connection {} closed by server", session.conn.conn_id);
                break;
            }
            read = timeout(read_timeout, read_half.read_buf(codec.buffer_mut())) => match read {
                Err(_) => {
                    info!("Read timeout on connection {}, closing", session.conn.conn_id);
                    break;
                }
                Ok(Ok(0)) => {
                    debug!("Peer {} closed the connection", peer);
                    break;
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!("Read error on connection {}: {}", session.conn.conn_id, e);
                    break;
                }
            }
        }
    }

    // Session cleanup: remove our own registry entry (never a successor's)
    // and let the remaining clients see the updated presence
    if let SessionState::Authenticated(username) = &session.state {
        let removed = match lock_sessions(dispatcher.sessions()) {
            Ok(mut registry) => registry.remove_if(username, session.conn.conn_id),
            Err(e) => {
                warn!("Failed to lock sessions during cleanup: {}", e);
                false
            }
        };

        if removed {
            if let Err(e) = broadcast_presence(dispatcher.sessions()) {
                warn!("Presence broadcast after disconnect failed: {}", e);
            }
        }
    }

    info!(
        "Client disconnected: {} ({}) after {:?}",
        session.conn.conn_id,
        peer,
        session.conn.connection_duration()
    );
}
