use std::collections::HashMap;

use async_trait::async_trait;
use kestrel_protocol::Message;

use crate::error::MemoryError;

/// A full dump of every conversation key's message log, used for
/// `exportSnapshot`/`importSnapshot` (spec §4.1, §8 round-trip property).
pub type Snapshot = HashMap<String, Vec<Message>>;

/// A mapping from conversation key to an ordered list of messages (spec
/// §4.1). `get` and `keys` never fail — an absent key reads as an empty
/// list, matching the contract callers rely on to avoid threading a
/// `Result` through the hot read path of every turn.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self, key: &str) -> Vec<Message>;

    async fn set(&self, key: &str, messages: Vec<Message>) -> Result<(), MemoryError>;

    /// Atomically appends `messages` after whatever is already stored at
    /// `key`. Concurrent appends to the same key from multiple tasks must
    /// observe a consistent, serialized order (spec §4.1, §5 locking).
    async fn append(&self, key: &str, messages: Vec<Message>) -> Result<(), MemoryError>;

    async fn delete(&self, key: &str) -> Result<(), MemoryError>;

    async fn keys(&self) -> Vec<String>;

    async fn clear(&self) -> Result<(), MemoryError>;

    async fn export_snapshot(&self) -> Result<Snapshot, MemoryError>;

    async fn import_snapshot(&self, snapshot: Snapshot) -> Result<(), MemoryError>;
}
