//! Request dispatcher with per-connection session state
//!
//! Interprets decoded requests, calls into the store and the session
//! registry, and produces responses. One `ClientSession` lives per
//! connection; the dispatcher itself is shared across all connections.

use chrono::Utc;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::core::connection::Connection;
use crate::core::message::{ClientRequest, ServerMessage};
use crate::core::session::{broadcast_presence, lock_sessions, Sessions};
use crate::error::{Result, RustyRelayError};
use crate::storage::Storage;

/// Authentication state of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(String),
}

/// Per-connection dispatch context
pub struct ClientSession {
    pub conn: Connection,
    pub peer: SocketAddr,
    pub state: SessionState,
}

impl ClientSession {
    pub fn new(conn: Connection, peer: SocketAddr) -> Self {
        Self {
            conn,
            peer,
            state: SessionState::Unauthenticated,
        }
    }
}

/// What the connection task should do after a request was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Routes client requests to the store and the session registry
pub struct RequestDispatcher {
    storage: Arc<dyn Storage>,
    sessions: Sessions,
}

impl RequestDispatcher {
    pub fn new(storage: Arc<dyn Storage>, sessions: Sessions) -> Self {
        Self { storage, sessions }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Handle one decoded request. Domain and infrastructure failures are
    /// answered on the session's own connection; they never end the
    /// connection or escape to the caller.
    pub async fn dispatch(&self, session: &mut ClientSession, request: ClientRequest) -> Flow {
        let result = match request {
            ClientRequest::Register {
                country,
                phone,
                username,
                password,
            } => self
                .handle_register(session, country, phone, username, password)
                .await
                .map(|_| Flow::Continue),
            ClientRequest::Login {
                identifier,
                password,
            } => self
                .handle_login(session, identifier, password)
                .await
                .map(|_| Flow::Continue),
            ClientRequest::GetOnlineUsers => self
                .handle_get_online_users(session)
                .map(|_| Flow::Continue),
            ClientRequest::SendMessage {
                from,
                to,
                message,
                timestamp,
            } => self
                .handle_send_message(session, from, to, message, timestamp)
                .await
                .map(|_| Flow::Continue),
            ClientRequest::ViewUsers => {
                self.handle_view_users(session).await.map(|_| Flow::Continue)
            }
            ClientRequest::DeleteUser { username } => self
                .handle_delete_user(session, username)
                .await
                .map(|_| Flow::Continue),
            ClientRequest::Logout { .. } => self.handle_logout(session),
            ClientRequest::Unknown => {
                self.respond(session, &ServerMessage::error("Unknown action"));
                Ok(Flow::Continue)
            }
        };

        match result {
            Ok(flow) => flow,
            Err(e) => {
                debug!("Request from {} failed: {}", session.peer, e);
                let wire_message = match e {
                    // Validation messages go out verbatim, everything else
                    // through its Display form
                    RustyRelayError::ValidationError(msg) => msg,
                    other => other.to_string(),
                };
                self.respond(session, &ServerMessage::error(wire_message));
                Flow::Continue
            }
        }
    }

    async fn handle_register(
        &self,
        session: &mut ClientSession,
        country: String,
        phone: String,
        username: String,
        password: String,
    ) -> Result<()> {
        if phone.is_empty() || username.is_empty() || password.is_empty() {
            return Err(RustyRelayError::ValidationError(
                "Missing registration fields".to_string(),
            ));
        }

        self.storage
            .create_account(&country, &phone, &username, &password)
            .await?;

        info!("Registered account {}", username);
        self.respond(session, &ServerMessage::success("Registered successfully"));
        Ok(())
    }

    async fn handle_login(
        &self,
        session: &mut ClientSession,
        identifier: String,
        password: String,
    ) -> Result<()> {
        if identifier.is_empty() || password.is_empty() {
            return Err(RustyRelayError::ValidationError(
                "Missing credentials".to_string(),
            ));
        }

        let username = self
            .storage
            .verify_account(&identifier, &password)
            .await?
            .ok_or(RustyRelayError::InvalidCredentials)?;

        let superseded = {
            let mut registry = lock_sessions(&self.sessions)?;

            // Re-login on an already-authenticated connection sheds the old
            // identity first so one socket never owns two usernames
            if let SessionState::Authenticated(previous) = &session.state {
                if previous != &username {
                    registry.remove_if(previous, session.conn.conn_id);
                }
            }

            registry.insert(username.clone(), session.conn.clone())
        };

        // Single-session policy: the new login wins, the old connection is
        // force-closed after its registry entry has been replaced
        if let Some(previous) = superseded {
            if previous.conn_id != session.conn.conn_id {
                info!("Superseding existing session for {}", username);
                previous.close();
            }
        }

        session.state = SessionState::Authenticated(username.clone());
        info!("Login successful for {} from {}", username, session.peer);

        self.respond(
            session,
            &ServerMessage::login_success("Login successful", username.clone()),
        );
        broadcast_presence(&self.sessions)?;
        self.replay_undelivered(&username, &session.conn).await
    }

    fn handle_get_online_users(&self, session: &mut ClientSession) -> Result<()> {
        let users = lock_sessions(&self.sessions)?.snapshot();
        self.respond(session, &ServerMessage::online_users(users));
        Ok(())
    }

    async fn handle_send_message(
        &self,
        session: &mut ClientSession,
        from: String,
        to: String,
        message: String,
        timestamp: Option<String>,
    ) -> Result<()> {
        if from.is_empty() || to.is_empty() || message.is_empty() {
            return Err(RustyRelayError::ValidationError(
                "Missing fields for private message".to_string(),
            ));
        }

        let sent_at = match timestamp.filter(|t| !t.is_empty()) {
            Some(t) => t,
            None => Utc::now().format("%I:%M %p").to_string(),
        };

        let target = lock_sessions(&self.sessions)?.lookup(&to);

        match target {
            Some(recipient) => {
                let notification =
                    ServerMessage::receive_message(from.clone(), message.clone(), sent_at.clone());

                if recipient.send_message(&notification) {
                    debug!("Delivered message from {} to {}", from, to);
                    self.respond(session, &ServerMessage::success("Delivered"));
                } else {
                    // Stale handle: fall back to the queue, then reap it
                    warn!("Live delivery to {} failed, storing message", to);
                    self.storage
                        .enqueue_message(&from, &to, &message, &sent_at)
                        .await?;
                    self.respond(session, &ServerMessage::success("Stored for later delivery"));

                    let reaped = lock_sessions(&self.sessions)?.remove_if(&to, recipient.conn_id);
                    if reaped {
                        recipient.close();
                        broadcast_presence(&self.sessions)?;
                    }
                }
            }
            None => {
                self.storage
                    .enqueue_message(&from, &to, &message, &sent_at)
                    .await?;
                debug!("Stored message from {} for offline recipient {}", from, to);
                self.respond(
                    session,
                    &ServerMessage::success("Recipient offline — stored"),
                );
            }
        }

        Ok(())
    }

    async fn handle_view_users(&self, session: &mut ClientSession) -> Result<()> {
        let accounts = self.storage.list_accounts().await?;
        self.respond(session, &ServerMessage::account_list(accounts));
        Ok(())
    }

    async fn handle_delete_user(
        &self,
        session: &mut ClientSession,
        username: String,
    ) -> Result<()> {
        if username.is_empty() {
            return Err(RustyRelayError::ValidationError(
                "username required".to_string(),
            ));
        }

        self.storage.delete_account(&username).await?;

        let live = lock_sessions(&self.sessions)?.remove(&username);
        if let Some(conn) = live {
            info!("Force-closing live session for deleted account {}", username);
            conn.close();
        }

        broadcast_presence(&self.sessions)?;
        self.respond(session, &ServerMessage::success("Deleted"));
        Ok(())
    }

    /// Logout removes the session's own registry entry regardless of the
    /// client-supplied username, then closes the connection.
    fn handle_logout(&self, session: &mut ClientSession) -> Result<Flow> {
        let username = match &session.state {
            SessionState::Authenticated(username) => username.clone(),
            SessionState::Unauthenticated => {
                return Err(RustyRelayError::ValidationError("Not logged in".to_string()));
            }
        };

        let removed = lock_sessions(&self.sessions)?.remove_if(&username, session.conn.conn_id);
        if removed {
            broadcast_presence(&self.sessions)?;
        }

        info!("Logout for {} from {}", username, session.peer);
        self.respond(session, &ServerMessage::success("Logged out"));
        Ok(Flow::Close)
    }

    /// Push queued messages in ascending id order; only the ids pushed
    /// successfully before a failure are marked delivered, so a later
    /// login retries the rest (at-least-once delivery).
    async fn replay_undelivered(&self, username: &str, conn: &Connection) -> Result<()> {
        let pending = self.storage.fetch_undelivered(username).await?;
        if pending.is_empty() {
            return Ok(());
        }

        info!(
            "Replaying {} stored message(s) for {}",
            pending.len(),
            username
        );

        let mut delivered = Vec::with_capacity(pending.len());
        for message in pending {
            let notification =
                ServerMessage::receive_message(message.sender, message.body, message.sent_at);
            if !conn.send_message(&notification) {
                warn!("Replay for {} interrupted mid-sequence", username);
                break;
            }
            delivered.push(message.id);
        }

        self.storage.mark_delivered(&delivered).await
    }

    /// Send a response on the session's own connection with error logging
    fn respond(&self, session: &ClientSession, message: &ServerMessage) {
        if !session.conn.send_message(message) {
            warn!("Failed to send response to {}", session.peer);
        }
    }
}
