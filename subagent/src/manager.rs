use std::sync::Arc;

use kestrel_memory::{subagent_key, InMemoryStore, MemoryStore};
use kestrel_protocol::{AgentEvent, EventSink, Message, SubAgentStatus, Usage};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bridge::SubAgentEventBridge;
use crate::executor::OrchestratorFactory;
use crate::task::{SubagentTask, MAX_DELEGATION_DEPTH};

/// Outcome of one sub-agent invocation, returned to the parent turn as a
/// plain tool result (spec §4.5, §7: sub-agent failures never raise).
#[derive(Debug, Clone)]
pub struct SubagentResult {
    pub status: SubAgentStatus,
    pub result_message: String,
    pub total_duration_ms: u64,
    pub usage: Option<Usage>,
}

/// Runs specialist agents to completion on behalf of a parent turn (spec
/// §4.5). Holds only the factory trait from [`crate::executor`], never an
/// `Orchestrator` concretely — see that module's doc comment for why.
pub struct SubagentManager {
    factory: Arc<dyn OrchestratorFactory>,
}

impl SubagentManager {
    pub fn new(factory: Arc<dyn OrchestratorFactory>) -> Self {
        Self { factory }
    }

    /// Runs `task` to completion, isolated from the parent's conversation
    /// memory except for the one-directional history seed `share_context`
    /// requests (spec §4.5 invariant: "a sub-agent's memory is isolated
    /// from its parent's unless explicitly shared").
    pub async fn execute_task(
        &self,
        task: SubagentTask,
        parent_history: &[Message],
        parent_events: Arc<dyn EventSink>,
        conversation_id: &str,
        message_id: &str,
        cancel: CancellationToken,
    ) -> SubagentResult {
        if task.delegation_depth >= MAX_DELEGATION_DEPTH {
            warn!(depth = task.delegation_depth, agent = %task.agent_name, "delegation depth cap exceeded, rejecting");
            return SubagentResult {
                status: SubAgentStatus::Error,
                result_message: format!("delegation depth {} exceeds the maximum of {}", task.delegation_depth, MAX_DELEGATION_DEPTH),
                total_duration_ms: 0,
                usage: None,
            };
        }

        let agent_id = kestrel_protocol::new_id();
        parent_events.emit(AgentEvent::SubAgentStarted {
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
            agent_id: agent_id.clone(),
            agent_name: task.agent_name.clone(),
            tool_call_id: task.tool_call_id.clone(),
        });

        let memory: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let conversation_key = subagent_key(&task.agent_name, &agent_id);
        if task.share_context && !parent_history.is_empty() {
            if let Err(err) = memory.set(&conversation_key, parent_history.to_vec()).await {
                warn!(error = %err, "failed to seed sub-agent memory with parent history");
            }
        }

        let bridge: Arc<dyn EventSink> =
            Arc::new(SubAgentEventBridge::new(parent_events.clone(), conversation_id, message_id, agent_id.clone(), task.tool_call_id.clone()));

        let executor = self.factory.build(task.config.clone(), memory, conversation_key, bridge, task.delegation_depth + 1);

        let start = tokio::time::Instant::now();
        let timeout = std::time::Duration::from_millis(task.timeout_ms);
        let outcome = tokio::time::timeout(timeout, executor.run_turn(task.prompt.clone(), cancel)).await;
        let total_duration_ms = start.elapsed().as_millis() as u64;

        let (status, result_message, usage) = match outcome {
            Ok(Ok(turn)) => (SubAgentStatus::Success, turn.content, turn.usage),
            Ok(Err(err)) => (SubAgentStatus::Error, err.to_string(), None),
            Err(_) => (SubAgentStatus::Timeout, format!("sub-agent '{}' timed out after {}ms", task.agent_name, task.timeout_ms), None),
        };

        parent_events.emit(AgentEvent::SubAgentCompleted {
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
            agent_id,
            agent_name: task.agent_name,
            status,
            result_message: result_message.clone(),
            total_duration_ms,
        });

        SubagentResult { status, result_message, total_duration_ms, usage }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kestrel_protocol::AgentConfig;

    use super::*;
    use crate::error::SubagentError;
    use crate::executor::TurnExecutor;
    use crate::executor::TurnOutcome;

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

    #[async_trait]
    impl TurnExecutor for EchoExecutor {
        async fn run_turn(&self, user_text: String, _cancel: CancellationToken) -> Result<TurnOutcome, SubagentError> {
            Ok(TurnOutcome { content: format!("echo: {user_text}"), usage: Some(Usage::new(3, 4)) })
        }
    }

    struct SleepyExecutor;

    #[async_trait]
    impl TurnExecutor for SleepyExecutor {
        async fn run_turn(&self, _user_text: String, _cancel: CancellationToken) -> Result<TurnOutcome, SubagentError> {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            Ok(TurnOutcome { content: "too slow".into(), usage: None })
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl TurnExecutor for FailingExecutor {
        async fn run_turn(&self, _user_text: String, _cancel: CancellationToken) -> Result<TurnOutcome, SubagentError> {
            Err(SubagentError::TurnFailed("boom".into()))
        }
    }

    struct FixedFactory<F: Fn() -> Arc<dyn TurnExecutor> + Send + Sync>(F);

    impl<F: Fn() -> Arc<dyn TurnExecutor> + Send + Sync> OrchestratorFactory for FixedFactory<F> {
        fn build(
            &self,
            _config: AgentConfig,
            _memory: Arc<dyn MemoryStore>,
            _conversation_key: String,
            _events: Arc<dyn EventSink>,
            _delegation_depth: u32,
        ) -> Arc<dyn TurnExecutor> {
            (self.0)()
        }
    }

    fn task(agent_name: &str, depth: u32) -> SubagentTask {
        let config = AgentConfig::new("reviewer", "gpt-5", "you review code");
        let mut t = SubagentTask::new(config, agent_name, "please review", "call-1");
        t.delegation_depth = depth;
        t
    }

    #[tokio::test]
    async fn successful_turn_emits_started_and_completed_with_success() {
        let factory = Arc::new(FixedFactory(|| Arc::new(EchoExecutor) as Arc<dyn TurnExecutor>));
        let manager = SubagentManager::new(factory);
        let parent = Arc::new(RecordingSink::new());

        let result = manager.execute_task(task("reviewer", 0), &[], parent.clone(), "conv", "msg", CancellationToken::new()).await;

        assert_eq!(result.status, SubAgentStatus::Success);
        assert_eq!(result.result_message, "echo: please review");
        let events = parent.events.lock().expect("lock");
        assert!(matches!(events[0], AgentEvent::SubAgentStarted { .. }));
        assert!(matches!(events[1], AgentEvent::SubAgentCompleted { status: SubAgentStatus::Success, .. }));
    }

    #[tokio::test]
    async fn depth_at_cap_is_rejected_without_starting() {
        let factory = Arc::new(FixedFactory(|| Arc::new(EchoExecutor) as Arc<dyn TurnExecutor>));
        let manager = SubagentManager::new(factory);
        let parent = Arc::new(RecordingSink::new());

        let result = manager.execute_task(task("reviewer", MAX_DELEGATION_DEPTH), &[], parent.clone(), "conv", "msg", CancellationToken::new()).await;

        assert_eq!(result.status, SubAgentStatus::Error);
        assert!(parent.events.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn failing_turn_is_reported_as_error_not_propagated() {
        let factory = Arc::new(FixedFactory(|| Arc::new(FailingExecutor) as Arc<dyn TurnExecutor>));
        let manager = SubagentManager::new(factory);
        let parent = Arc::new(RecordingSink::new());

        let result = manager.execute_task(task("reviewer", 0), &[], parent.clone(), "conv", "msg", CancellationToken::new()).await;

        assert_eq!(result.status, SubAgentStatus::Error);
        assert!(result.result_message.contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported_as_timeout_status() {
        let factory = Arc::new(FixedFactory(|| Arc::new(SleepyExecutor) as Arc<dyn TurnExecutor>));
        let manager = SubagentManager::new(factory);
        let parent = Arc::new(RecordingSink::new());
        let mut t = task("reviewer", 0);
        t.timeout_ms = 50;

        let result = manager.execute_task(t, &[], parent.clone(), "conv", "msg", CancellationToken::new()).await;

        assert_eq!(result.status, SubAgentStatus::Timeout);
    }
}
