use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kestrel_memory::ConversationStore;
use kestrel_protocol::{AgentConfig, ErrorReason, EventSink, SubAgentStatus, ToolExecutionResult};
use kestrel_subagent::{SubagentManager, SubagentTask};
use kestrel_tools::{Tool, ToolContext, ToolSpec};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Name under which `DelegateTool` registers itself (spec §4.5: "a tool
/// that spawns a narrowly-scoped specialist agent").
pub const DELEGATE_TOOL_NAME: &str = "delegate_to_agent";

#[derive(Debug, Deserialize)]
struct DelegateParams {
    agent: String,
    prompt: String,
    #[serde(default)]
    share_context: bool,
}

/// The tool the orchestrator's own turn loop dispatches to in order to
/// run a specialist agent (spec §4.5). Bridges the plain `Tool`
/// execution contract (spec §4.3) to `SubagentManager::execute_task`:
/// parent history, the parent's event sink, and the proposing
/// `conversation_id`/`message_id` all come from `ToolContext` and the
/// `ConversationStore` this tool was built with, rather than from the
/// tool call's own parameters.
pub struct DelegateTool {
    manager: Arc<SubagentManager>,
    memory: Arc<ConversationStore>,
    events: Arc<dyn EventSink>,
    profiles: Arc<HashMap<String, AgentConfig>>,
    spec: ToolSpec,
}

impl DelegateTool {
    pub fn new(
        manager: Arc<SubagentManager>,
        memory: Arc<ConversationStore>,
        events: Arc<dyn EventSink>,
        profiles: Arc<HashMap<String, AgentConfig>>,
    ) -> Self {
        let agent_names: Vec<&str> = profiles.keys().map(String::as_str).collect();
        let spec = ToolSpec::new(
            DELEGATE_TOOL_NAME,
            format!("Delegates a task to a named specialist agent. Available agents: {}", agent_names.join(", ")),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "agent": { "type": "string", "enum": agent_names },
                    "prompt": { "type": "string" },
                    "share_context": { "type": "boolean" },
                },
                "required": ["agent", "prompt"],
            }),
        );
        Self { manager, memory, events, profiles, spec }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(
        &self,
        id: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
        cancel: CancellationToken,
    ) -> ToolExecutionResult {
        let params: DelegateParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(err) => {
                return ToolExecutionResult::error(
                    id,
                    DELEGATE_TOOL_NAME,
                    format!("invalid delegation arguments: {err}"),
                    ErrorReason::InvalidInput,
                    0,
                );
            }
        };

        let Some(config) = self.profiles.get(&params.agent) else {
            return ToolExecutionResult::error(
                id,
                DELEGATE_TOOL_NAME,
                format!("no agent profile registered for '{}'", params.agent),
                ErrorReason::NotFound,
                0,
            );
        };

        let history = if params.share_context { self.memory.get(&ctx.conversation_id).await } else { Vec::new() };

        let mut task = SubagentTask::new(config.clone(), params.agent.clone(), params.prompt, id);
        task.delegation_depth = ctx.delegation_depth;
        task.share_context = params.share_context;

        let started = tokio::time::Instant::now();
        let result = self
            .manager
            .execute_task(task, &history, self.events.clone(), &ctx.conversation_id, &ctx.message_id, cancel)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result.status {
            SubAgentStatus::Success => ToolExecutionResult::text_ok(id, DELEGATE_TOOL_NAME, result.result_message, duration_ms),
            SubAgentStatus::Timeout => {
                ToolExecutionResult::error(id, DELEGATE_TOOL_NAME, result.result_message, ErrorReason::Timeout, duration_ms)
            }
            SubAgentStatus::Error => {
                ToolExecutionResult::error(id, DELEGATE_TOOL_NAME, result.result_message, ErrorReason::Unknown, duration_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait as async_trait_alias;
    use kestrel_memory::InMemoryStore;
    use kestrel_protocol::AgentEvent;
    use kestrel_subagent::OrchestratorFactory;
    use kestrel_subagent::TurnExecutor;
    use kestrel_subagent::TurnOutcome;

    use super::*;

    struct RecordingSink {
        events: Mutex<Vec<AgentEvent>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { events: Mutex::new(Vec::new()) }
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: AgentEvent) {
            self.events.lock().expect("lock").push(event);
        }
    }

    struct EchoExecutor;

    #[async_trait_alias]
    impl TurnExecutor for EchoExecutor {
        async fn run_turn(
            &self,
            user_text: String,
            _cancel: CancellationToken,
        ) -> Result<TurnOutcome, kestrel_subagent::SubagentError> {
            Ok(TurnOutcome { content: format!("handled: {user_text}"), usage: None })
        }
    }

    struct FixedFactory;

    impl OrchestratorFactory for FixedFactory {
        fn build(
            &self,
            _config: AgentConfig,
            _memory: Arc<dyn kestrel_memory::MemoryStore>,
            _conversation_key: String,
            _events: Arc<dyn EventSink>,
            _delegation_depth: u32,
        ) -> Arc<dyn TurnExecutor> {
            Arc::new(EchoExecutor)
        }
    }

    fn profiles() -> Arc<HashMap<String, AgentConfig>> {
        let mut map = HashMap::new();
        map.insert("reviewer".to_string(), AgentConfig::new("reviewer", "gpt-5", "you review code"));
        Arc::new(map)
    }

    #[tokio::test]
    async fn unknown_agent_synthesizes_not_found() {
        let manager = Arc::new(SubagentManager::new(Arc::new(FixedFactory)));
        let memory = Arc::new(ConversationStore::new(Arc::new(InMemoryStore::new())));
        let events: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        let tool = DelegateTool::new(manager, memory, events, profiles());
        let ctx = ToolContext::new("c").with_message_id("m");

        let result = tool
            .execute("1", serde_json::json!({"agent": "ghost", "prompt": "hi"}), &ctx, CancellationToken::new())
            .await;

        assert_eq!(result.error_reason(), Some(ErrorReason::NotFound));
    }

    #[tokio::test]
    async fn known_agent_runs_and_returns_its_content() {
        let manager = Arc::new(SubagentManager::new(Arc::new(FixedFactory)));
        let memory = Arc::new(ConversationStore::new(Arc::new(InMemoryStore::new())));
        let events: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        let tool = DelegateTool::new(manager, memory, events, profiles());
        let ctx = ToolContext::new("c").with_message_id("m");

        let result = tool
            .execute("1", serde_json::json!({"agent": "reviewer", "prompt": "review this"}), &ctx, CancellationToken::new())
            .await;

        assert_eq!(result.result_as_text(), "handled: review this");
    }
}
