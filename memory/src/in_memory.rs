use async_trait::async_trait;
use dashmap::DashMap;
use kestrel_protocol::Message;

use crate::error::MemoryError;
use crate::store::{MemoryStore, Snapshot};

/// Process-local `MemoryStore`, used for sub-agents (spec §4.5: disjoint,
/// throwaway memory per invocation) and tests.
///
/// `DashMap::entry` holds an exclusive lock on the key's shard for the
/// duration of the closure, which is what gives `append` its atomicity —
/// the same pattern the teacher's session-scoped store registries use for
/// their `DashMap<ConversationId, _>` maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: DashMap<String, Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { data: DashMap::new() }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, key: &str) -> Vec<Message> {
        self.data.get(key).map(|entry| entry.clone()).unwrap_or_default()
    }

    async fn set(&self, key: &str, messages: Vec<Message>) -> Result<(), MemoryError> {
        self.data.insert(key.to_string(), messages);
        Ok(())
    }

    async fn append(&self, key: &str, messages: Vec<Message>) -> Result<(), MemoryError> {
        self.data.entry(key.to_string()).or_default().extend(messages);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        self.data.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Vec<String> {
        self.data.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.data.clear();
        Ok(())
    }

    async fn export_snapshot(&self) -> Result<Snapshot, MemoryError> {
        Ok(self.data.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect())
    }

    async fn import_snapshot(&self, snapshot: Snapshot) -> Result<(), MemoryError> {
        self.data.clear();
        for (key, messages) in snapshot {
            self.data.insert(key, messages);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_protocol::Message;

    #[tokio::test]
    async fn get_on_absent_key_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.get("nope").await.is_empty());
    }

    #[tokio::test]
    async fn append_preserves_order_and_existing() {
        let store = InMemoryStore::new();
        store.append("c", vec![Message::user("one")]).await.unwrap();
        store.append("c", vec![Message::user("two")]).await.unwrap();
        let messages = store.get("c").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.as_text(), "one");
        assert_eq!(messages[1].content.as_text(), "two");
    }

    #[tokio::test]
    async fn set_replaces_existing() {
        let store = InMemoryStore::new();
        store.append("c", vec![Message::user("one")]).await.unwrap();
        store.set("c", vec![Message::user("replaced")]).await.unwrap();
        let messages = store.get("c").await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.as_text(), "replaced");
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let store = InMemoryStore::new();
        store.append("a", vec![Message::user("hi")]).await.unwrap();
        store.append("b", vec![Message::user("yo")]).await.unwrap();
        let snapshot = store.export_snapshot().await.unwrap();

        let restored = InMemoryStore::new();
        restored.import_snapshot(snapshot).await.unwrap();

        let mut original_keys = store.keys().await;
        let mut restored_keys = restored.keys().await;
        original_keys.sort();
        restored_keys.sort();
        assert_eq!(original_keys, restored_keys);
        assert_eq!(restored.get("a").await, store.get("a").await);
    }

    #[tokio::test]
    async fn concurrent_appends_are_serialized() {
        use std::sync::Arc;
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append("c", vec![Message::user(format!("{i}"))]).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get("c").await.len(), 20);
    }
}
