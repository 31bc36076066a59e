//! Abstract storage interfaces for pluggable backends
//!
//! This module defines the records and traits the durable store exposes:
//! account lifecycle and the undelivered-message queue. Both the SQLite
//! and the in-memory backends implement the same traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Registered account as exposed to listings. The credential secret never
/// leaves the store; it is only compared inside `verify_account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub country: String,
    pub phone: String,
    pub username: String,
}

/// A message persisted because it could not be delivered at send time.
/// `delivered` transitions false -> true exactly once; rows are never
/// deleted and double as delivery history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub sent_at: String,
    pub delivered: bool,
}

/// Account storage interface
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Create a new account. Fails with `Duplicate` if the username or the
    /// phone number is already taken.
    async fn create_account(
        &self,
        country: &str,
        phone: &str,
        username: &str,
        secret: &str,
    ) -> Result<()>;

    /// Check credentials. `identifier` matches either the username or the
    /// phone number; returns the canonical username on an exact secret
    /// match, `None` otherwise.
    async fn verify_account(&self, identifier: &str, secret: &str) -> Result<Option<String>>;

    /// List all accounts, ordered by username case-insensitively
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Delete an account. Idempotent; pending messages are NOT cascaded.
    async fn delete_account(&self, username: &str) -> Result<()>;
}

/// Undelivered-message queue interface
#[async_trait]
pub trait MessageStorage: Send + Sync {
    /// Append an undelivered message and return its assigned id.
    /// Ids increase monotonically per store.
    async fn enqueue_message(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
        sent_at: &str,
    ) -> Result<i64>;

    /// Fetch all undelivered messages for a recipient in ascending id order
    async fn fetch_undelivered(&self, recipient: &str) -> Result<Vec<PendingMessage>>;

    /// Mark exactly the given ids delivered, atomically with respect to
    /// concurrent callers. Unknown ids and the empty set are no-ops.
    async fn mark_delivered(&self, ids: &[i64]) -> Result<()>;
}

/// Combined storage bound held by the dispatcher
pub trait Storage: AccountStorage + MessageStorage {}

impl<T: AccountStorage + MessageStorage> Storage for T {}
