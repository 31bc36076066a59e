//! Session registry
//!
//! Thread-safe directory of currently-reachable usernames to their live
//! connection handles, and the source of presence snapshots. All registry
//! operations are serialized behind one mutex so a login's insert cannot
//! interleave with a concurrent disconnect removal. The lock is never held
//! across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::core::connection::Connection;
use crate::core::message::ServerMessage;
use crate::error::Result;

/// Maps authenticated usernames to their live connection handles
pub struct SessionRegistry {
    connections: HashMap<String, Connection>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Install or replace the mapping for a username, returning the
    /// superseded connection if one was present
    pub fn insert(&mut self, username: String, connection: Connection) -> Option<Connection> {
        self.connections.insert(username, connection)
    }

    /// Remove a session; idempotent
    pub fn remove(&mut self, username: &str) -> Option<Connection> {
        self.connections.remove(username)
    }

    /// Remove a session only if it still refers to the given connection.
    /// Disconnect cleanup uses this so a stale handler cannot evict a
    /// successor session for the same username.
    pub fn remove_if(&mut self, username: &str, conn_id: Uuid) -> bool {
        match self.connections.get(username) {
            Some(current) if current.conn_id == conn_id => {
                self.connections.remove(username);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, username: &str) -> Option<Connection> {
        self.connections.get(username).cloned()
    }

    /// Usernames with an active session
    pub fn snapshot(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// Current (username, handle) pairs, for broadcasting
    pub fn handles(&self) -> Vec<(String, Connection)> {
        self.connections
            .iter()
            .map(|(username, conn)| (username.clone(), conn.clone()))
            .collect()
    }

    /// Get current session count
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Thread-safe session registry wrapper
pub type Sessions = Arc<Mutex<SessionRegistry>>;

// Create a new thread-safe session registry
pub fn create_session_registry() -> Sessions {
    Arc::new(Mutex::new(SessionRegistry::new()))
}

// Lock helper converting poisoning into a crate error
pub fn lock_sessions(sessions: &Sessions) -> Result<MutexGuard<'_, SessionRegistry>> {
    sessions.lock().map_err(Into::into)
}

/// Push the current presence snapshot to every registered connection as an
/// `update_users` notification. A handle whose send fails is dead: it is
/// closed, removed, and the pass repeats so that every live connection
/// eventually sees a snapshot without the dead entries.
pub fn broadcast_presence(sessions: &Sessions) -> Result<()> {
    loop {
        let targets = {
            let registry = lock_sessions(sessions)?;
            registry.handles()
        };

        let users: Vec<String> = targets.iter().map(|(username, _)| username.clone()).collect();
        let payload = ServerMessage::update_users(users);

        let mut dead = Vec::new();
        for (username, conn) in targets {
            if !conn.send_message(&payload) {
                dead.push((username, conn));
            }
        }

        if dead.is_empty() {
            return Ok(());
        }

        let mut registry = lock_sessions(sessions)?;
        for (username, conn) in dead {
            if registry.remove_if(&username, conn.conn_id) {
                conn.close();
            }
        }
    }
}
