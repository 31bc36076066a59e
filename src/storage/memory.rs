//! In-memory storage implementation for development and testing
//!
//! This provides a complete storage implementation that keeps all data
//! in memory. Suitable for development, testing, or ephemeral deployments
//! that do not need messages to survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::traits::{Account, AccountStorage, MessageStorage, PendingMessage};
use crate::error::{Result, RustyRelayError};

struct StoredAccount {
    country: String,
    phone: String,
    username: String,
    secret: String,
}

/// In-memory account and message storage
pub struct MemoryStorage {
    accounts: RwLock<HashMap<String, StoredAccount>>,
    messages: RwLock<Vec<PendingMessage>>,
    next_id: RwLock<i64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
            next_id: RwLock::new(1),
        }
    }

    async fn generate_id(&self) -> i64 {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStorage for MemoryStorage {
    async fn create_account(
        &self,
        country: &str,
        phone: &str,
        username: &str,
        secret: &str,
    ) -> Result<()> {
        let mut accounts = self.accounts.write().await;

        if accounts.contains_key(username) || accounts.values().any(|a| a.phone == phone) {
            return Err(RustyRelayError::Duplicate);
        }

        accounts.insert(
            username.to_string(),
            StoredAccount {
                country: country.to_string(),
                phone: phone.to_string(),
                username: username.to_string(),
                secret: secret.to_string(),
            },
        );

        Ok(())
    }

    async fn verify_account(&self, identifier: &str, secret: &str) -> Result<Option<String>> {
        let accounts = self.accounts.read().await;

        let found = accounts
            .values()
            .find(|a| a.username == identifier || a.phone == identifier);

        Ok(found.and_then(|a| {
            if a.secret == secret {
                Some(a.username.clone())
            } else {
                None
            }
        }))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;

        let mut listed: Vec<Account> = accounts
            .values()
            .map(|a| Account {
                country: a.country.clone(),
                phone: a.phone.clone(),
                username: a.username.clone(),
            })
            .collect();

        listed.sort_by_key(|a| a.username.to_lowercase());
        Ok(listed)
    }

    async fn delete_account(&self, username: &str) -> Result<()> {
        self.accounts.write().await.remove(username);
        Ok(())
    }
}

#[async_trait]
impl MessageStorage for MemoryStorage {
    async fn enqueue_message(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
        sent_at: &str,
    ) -> Result<i64> {
        let id = self.generate_id().await;

        self.messages.write().await.push(PendingMessage {
            id,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            body: body.to_string(),
            sent_at: sent_at.to_string(),
            delivered: false,
        });

        Ok(id)
    }

    async fn fetch_undelivered(&self, recipient: &str) -> Result<Vec<PendingMessage>> {
        let messages = self.messages.read().await;

        // The vector is append-only, so it is already in ascending id order
        Ok(messages
            .iter()
            .filter(|m| m.recipient == recipient && !m.delivered)
            .cloned()
            .collect())
    }

    async fn mark_delivered(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut messages = self.messages.write().await;
        for message in messages.iter_mut() {
            if ids.contains(&message.id) {
                message.delivered = true;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let storage = MemoryStorage::new();
        storage
            .create_account("US", "+1555", "alice", "pw1")
            .await
            .unwrap();

        let err = storage
            .create_account("US", "+1556", "alice", "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, RustyRelayError::Duplicate));
        assert_eq!(storage.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let storage = MemoryStorage::new();
        storage
            .create_account("US", "+1555", "alice", "pw1")
            .await
            .unwrap();

        let err = storage
            .create_account("US", "+1555", "bob", "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, RustyRelayError::Duplicate));
    }

    #[tokio::test]
    async fn test_verify_by_username_and_phone() {
        let storage = MemoryStorage::new();
        storage
            .create_account("US", "+1555", "alice", "pw1")
            .await
            .unwrap();

        assert_eq!(
            storage.verify_account("alice", "pw1").await.unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(
            storage.verify_account("+1555", "pw1").await.unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(storage.verify_account("alice", "PW1").await.unwrap(), None);
        assert_eq!(storage.verify_account("nobody", "pw1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_undelivered_queue_ordering_and_marking() {
        let storage = MemoryStorage::new();
        let first = storage
            .enqueue_message("bob", "alice", "one", "10:00 AM")
            .await
            .unwrap();
        let second = storage
            .enqueue_message("bob", "alice", "two", "10:01 AM")
            .await
            .unwrap();
        assert!(second > first);

        let pending = storage.fetch_undelivered("alice").await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].body, "one");
        assert_eq!(pending[1].body, "two");

        storage.mark_delivered(&[first]).await.unwrap();
        let pending = storage.fetch_undelivered("alice").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);
    }

    #[tokio::test]
    async fn test_delete_account_keeps_messages() {
        let storage = MemoryStorage::new();
        storage
            .create_account("US", "+1555", "alice", "pw1")
            .await
            .unwrap();
        storage
            .enqueue_message("bob", "alice", "hello", "10:00 AM")
            .await
            .unwrap();

        storage.delete_account("alice").await.unwrap();
        assert!(storage.list_accounts().await.unwrap().is_empty());
        assert_eq!(storage.fetch_undelivered("alice").await.unwrap().len(), 1);

        // Deleting again is a no-op
        storage.delete_account("alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_accounts_sorted_case_insensitively() {
        let storage = MemoryStorage::new();
        storage
            .create_account("US", "+1", "Zoe", "pw")
            .await
            .unwrap();
        storage
            .create_account("US", "+2", "alice", "pw")
            .await
            .unwrap();
        storage
            .create_account("US", "+3", "Bob", "pw")
            .await
            .unwrap();

        let names: Vec<String> = storage
            .list_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.username)
            .collect();
        assert_eq!(names, vec!["alice", "Bob", "Zoe"]);
    }
}
