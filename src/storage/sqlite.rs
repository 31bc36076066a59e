//! SQLite storage backend
//!
//! Durable implementation of the storage traits over a `sqlx` connection
//! pool. The schema is created on connect, so a fresh database file is
//! usable immediately and an existing one is reused across restarts. The
//! `users` table is shared with the administrative tooling, which reads
//! and deletes rows directly.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use super::traits::{Account, AccountStorage, MessageStorage, PendingMessage};
use crate::error::{Result, RustyRelayError};

const CREATE_USERS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country TEXT,
    phone TEXT UNIQUE,
    username TEXT UNIQUE,
    secret TEXT
)";

const CREATE_MESSAGES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT,
    recipient TEXT,
    message TEXT,
    timestamp TEXT,
    delivered INTEGER DEFAULT 0
)";

fn storage_err(err: sqlx::Error) -> RustyRelayError {
    RustyRelayError::StorageError(err.to_string())
}

/// SQLite-backed account and message storage
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) the database and ensure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(storage_err)?;

        sqlx::query(CREATE_USERS_TABLE)
            .execute(&pool)
            .await
            .map_err(storage_err)?;
        sqlx::query(CREATE_MESSAGES_TABLE)
            .execute(&pool)
            .await
            .map_err(storage_err)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl AccountStorage for SqliteStorage {
    async fn create_account(
        &self,
        country: &str,
        phone: &str,
        username: &str,
        secret: &str,
    ) -> Result<()> {
        let inserted =
            sqlx::query("INSERT INTO users (country, phone, username, secret) VALUES (?, ?, ?, ?)")
                .bind(country)
                .bind(phone)
                .bind(username)
                .bind(secret)
                .execute(&self.pool)
                .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RustyRelayError::Duplicate)
            }
            Err(err) => Err(storage_err(err)),
        }
    }

    async fn verify_account(&self, identifier: &str, secret: &str) -> Result<Option<String>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT username, secret FROM users WHERE phone = ? OR username = ?")
                .bind(identifier)
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;

        // Exact, case-sensitive comparison; the secret is opaque material
        Ok(row.and_then(|(username, stored)| {
            if stored == secret {
                Some(username)
            } else {
                None
            }
        }))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT country, phone, username FROM users ORDER BY username COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .into_iter()
            .map(|(country, phone, username)| Account {
                country,
                phone,
                username,
            })
            .collect())
    }

    async fn delete_account(&self, username: &str) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl MessageStorage for SqliteStorage {
    async fn enqueue_message(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
        sent_at: &str,
    ) -> Result<i64> {
        let inserted = sqlx::query(
            "INSERT INTO messages (sender, recipient, message, timestamp, delivered) \
             VALUES (?, ?, ?, ?, 0)",
        )
        .bind(sender)
        .bind(recipient)
        .bind(body)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(inserted.last_insert_rowid())
    }

    async fn fetch_undelivered(&self, recipient: &str) -> Result<Vec<PendingMessage>> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, sender, message, timestamp FROM messages \
             WHERE recipient = ? AND delivered = 0 ORDER BY id ASC",
        )
        .bind(recipient)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, sender, body, sent_at)| PendingMessage {
                id,
                sender,
                recipient: recipient.to_string(),
                body,
                sent_at,
                delivered: false,
            })
            .collect())
    }

    async fn mark_delivered(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for id in ids {
            sqlx::query("UPDATE messages SET delivered = 1 WHERE id = ?")
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;

        Ok(())
    }
}
