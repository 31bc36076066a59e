//! Storage mechanisms for persisting accounts and undelivered messages

pub mod memory;
pub mod sqlite;
pub mod traits;

// Re-export the storage interfaces and backends
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Account, AccountStorage, MessageStorage, PendingMessage, Storage};
