use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use kestrel_protocol::{ConversationMetadata, Message};
use tracing::warn;

use crate::error::MemoryError;
use crate::file_backed::{load_metadata_file, persist_metadata_file, FileBackedStore};
use crate::store::MemoryStore;

/// Wraps a `MemoryStore` with per-conversation `ConversationMetadata`
/// (spec §2, §3: "Conversation Store wraps Memory with per-conversation
/// metadata").
///
/// Metadata tracking lives here rather than in each `MemoryStore`
/// implementation so `InMemoryStore` and `FileBackedStore` stay focused on
/// the message log; any store can be wrapped uniformly. When opened via
/// [`ConversationStore::open_file_backed`], this also owns the sibling
/// `metadata.json` document (spec §6) — `new` alone (used for sub-agents
/// and tests, whose `InMemoryStore` never persists) leaves `persist_dir`
/// unset, so the metadata map stays purely in-process there.
pub struct ConversationStore {
    store: Arc<dyn MemoryStore>,
    metadata: DashMap<String, ConversationMetadata>,
    persist_dir: Option<PathBuf>,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store, metadata: DashMap::new(), persist_dir: None }
    }

    /// Opens a file-backed message log and rehydrates its sibling
    /// `metadata.json` under the same `dir` (spec §6: "A sibling file
    /// `metadata.json` stores `{ "<conversationKey>": ConversationMetadata
    /// }`"). Every subsequent metadata mutation rewrites that file.
    pub async fn open_file_backed(dir: impl Into<PathBuf>) -> Result<Self, MemoryError> {
        let dir = dir.into();
        let store = FileBackedStore::open(&dir).await?;
        let loaded = load_metadata_file(&dir).await?;
        let metadata = DashMap::new();
        for (key, value) in loaded {
            metadata.insert(key, value);
        }
        Ok(Self { store: Arc::new(store), metadata, persist_dir: Some(dir) })
    }

    pub fn store(&self) -> Arc<dyn MemoryStore> {
        self.store.clone()
    }

    pub async fn get(&self, key: &str) -> Vec<Message> {
        self.store.get(key).await
    }

    /// Appends `messages` and updates the conversation's metadata
    /// (`messageCount`, `updatedAt`) in the same call, per spec §4.1.
    pub async fn append(&self, key: &str, messages: Vec<Message>) -> Result<(), MemoryError> {
        let added = messages.len();
        self.store.append(key, messages).await?;
        {
            let mut entry = self.metadata.entry(key.to_string()).or_insert_with(ConversationMetadata::new);
            entry.message_count += added;
            entry.updated_at = chrono::Utc::now();
        }
        self.persist_metadata().await;
        Ok(())
    }

    /// Replaces a conversation's full history (used by auto-summary's
    /// history-replacement path, spec §4.7) and records `summarized_from`.
    pub async fn replace_with_summary(
        &self,
        key: &str,
        messages: Vec<Message>,
        summarized_from: Option<String>,
    ) -> Result<(), MemoryError> {
        self.store.set(key, messages.clone()).await?;
        {
            let mut entry = self.metadata.entry(key.to_string()).or_insert_with(ConversationMetadata::new);
            entry.message_count = messages.len();
            entry.updated_at = chrono::Utc::now();
            entry.summarized_from = summarized_from;
        }
        self.persist_metadata().await;
        Ok(())
    }

    pub fn metadata(&self, key: &str) -> ConversationMetadata {
        self.metadata.get(key).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// Adds token/cost usage to a conversation's running totals (fed by
    /// `kestrel-metrics` after each completion, spec §4.7).
    pub async fn record_usage(&self, key: &str, prompt_tokens: u64, completion_tokens: u64, cost_usd: f64) {
        {
            let mut entry = self.metadata.entry(key.to_string()).or_insert_with(ConversationMetadata::new);
            entry.total_prompt_tokens += prompt_tokens;
            entry.total_completion_tokens += completion_tokens;
            entry.estimated_cost_usd += cost_usd;
            entry.updated_at = chrono::Utc::now();
        }
        self.persist_metadata().await;
    }

    /// Resets the running token/cost counters, called after auto-summary
    /// fires (spec §4.7: "After either action, reset the metrics counters
    /// for the session").
    pub async fn reset_usage(&self, key: &str) {
        {
            if let Some(mut entry) = self.metadata.get_mut(key) {
                entry.total_prompt_tokens = 0;
                entry.total_completion_tokens = 0;
                entry.estimated_cost_usd = 0.0;
            }
        }
        self.persist_metadata().await;
    }

    pub async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        self.metadata.remove(key);
        self.persist_metadata().await;
        self.store.delete(key).await
    }

    /// Rewrites `metadata.json` from the current in-memory map. A no-op
    /// when this store wasn't opened via `open_file_backed` — sub-agent
    /// and test stores never touch disk for metadata.
    async fn persist_metadata(&self) {
        let Some(dir) = &self.persist_dir else { return };
        let snapshot: HashMap<String, ConversationMetadata> =
            self.metadata.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect();
        if let Err(err) = persist_metadata_file(dir, &snapshot).await {
            warn!(error = %err, "failed to persist conversation metadata");
        }
    }
}
