use std::sync::Arc;

use async_trait::async_trait;
use kestrel_memory::{ConversationStore, MemoryStore};
use kestrel_protocol::{AgentConfig, EventSink};
use kestrel_subagent::{OrchestratorFactory, SubagentError, TurnExecutor, TurnOutcome};
use tokio_util::sync::CancellationToken;

use crate::options::SendOptions;
use crate::orchestrator::Orchestrator;
use crate::runtime::Runtime;

/// Builds a fresh `Orchestrator` for each specialist-agent invocation
/// (spec §4.5), closing `kestrel-subagent`'s `OrchestratorFactory` seam
/// without `kestrel-subagent` depending on this crate (see
/// `kestrel_subagent::executor`'s doc comment for why that dependency
/// would otherwise cycle).
///
/// Sub-agents always run with `requireToolApproval=false` (spec §4.5);
/// this factory enforces that here rather than trusting every caller of
/// `SubagentTask` to remember it.
pub struct CoreOrchestratorFactory {
    runtime: Arc<Runtime>,
}

impl CoreOrchestratorFactory {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }
}

impl OrchestratorFactory for CoreOrchestratorFactory {
    fn build(
        &self,
        mut config: AgentConfig,
        memory: Arc<dyn MemoryStore>,
        conversation_key: String,
        events: Arc<dyn EventSink>,
        delegation_depth: u32,
    ) -> Arc<dyn TurnExecutor> {
        config.require_tool_approval = false;
        let conversation_store = Arc::new(ConversationStore::new(memory));
        let orchestrator =
            Orchestrator::new(self.runtime.clone(), config, conversation_store, events, delegation_depth);
        Arc::new(SubagentTurnExecutor { orchestrator, conversation_key })
    }
}

struct SubagentTurnExecutor {
    orchestrator: Orchestrator,
    conversation_key: String,
}

#[async_trait]
impl TurnExecutor for SubagentTurnExecutor {
    async fn run_turn(&self, user_text: String, cancel: CancellationToken) -> Result<TurnOutcome, SubagentError> {
        let opts = SendOptions::new().with_conversation_id(self.conversation_key.clone()).with_signal(cancel);
        let response = self
            .orchestrator
            .send(user_text, opts)
            .await
            .map_err(|err| SubagentError::TurnFailed(err.to_string()))?;
        Ok(TurnOutcome { content: response.content.as_text(), usage: response.usage })
    }
}
