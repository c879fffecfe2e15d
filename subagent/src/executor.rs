use std::sync::Arc;

use async_trait::async_trait;
use kestrel_memory::MemoryStore;
use kestrel_protocol::{AgentConfig, EventSink, Usage};
use tokio_util::sync::CancellationToken;

use crate::error::SubagentError;

/// Final content produced by one sub-agent turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub content: String,
    pub usage: Option<Usage>,
}

/// A runnable turn loop, implemented by `kestrel-core`'s `Orchestrator`.
///
/// Defined here rather than depended on directly so `kestrel-subagent`
/// never needs to depend on `kestrel-core` (which itself depends on
/// `kestrel-subagent` to offer delegation as a tool) — the dependency
/// direction spec §2 lays out would otherwise cycle. `kestrel-core`
/// supplies an `OrchestratorFactory` that closes over its shared
/// `ToolRegistry`/`ModelBackend`/`ReminderEngine` and builds a fresh
/// `Orchestrator` wired to the sub-agent's own isolated memory and event
/// sink on demand.
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    async fn run_turn(&self, user_text: String, cancel: CancellationToken) -> Result<TurnOutcome, SubagentError>;
}

/// Builds a `TurnExecutor` scoped to one sub-agent invocation.
pub trait OrchestratorFactory: Send + Sync {
    fn build(
        &self,
        config: AgentConfig,
        memory: Arc<dyn MemoryStore>,
        conversation_key: String,
        events: Arc<dyn EventSink>,
        delegation_depth: u32,
    ) -> Arc<dyn TurnExecutor>;
}
