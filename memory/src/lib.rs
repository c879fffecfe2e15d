//! Per-session message storage for the Kestrel agent runtime.
//!
//! Two `MemoryStore` implementations — [`InMemoryStore`] for sub-agents
//! and tests, [`FileBackedStore`] for persistent sessions — sit behind a
//! single trait so `kestrel-core` never needs to know which one it holds.
//! [`ConversationStore`] layers per-conversation metadata on top of either.

mod conversation;
mod error;
mod file_backed;
mod in_memory;
mod store;

pub use conversation::ConversationStore;
pub use error::MemoryError;
pub use file_backed::FileBackedStore;
pub use in_memory::InMemoryStore;
pub use store::MemoryStore;
pub use store::Snapshot;

/// Builds the conversation key for a sub-agent's isolated memory (spec
/// §6 persistent-state layout: `agent:<type>:<id>`).
pub fn subagent_key(agent_type: &str, agent_id: &str) -> String {
    format!("agent:{agent_type}:{agent_id}")
}

#[cfg(test)]
mod tests {
    #[test]
    fn subagent_key_format() {
        assert_eq!(super::subagent_key("explore", "abc123"), "agent:explore:abc123");
    }
}
