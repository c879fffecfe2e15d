use std::sync::Arc;

use kestrel_protocol::{AgentEvent, EventSink};

/// Rewraps a child `Orchestrator`'s event stream as the parent-facing
/// `SubAgent*` variants (spec §4.5, §6).
///
/// A sub-agent's own turn emits the same `AgentEvent` vocabulary as any
/// top-level turn — `ToolCalls`, `ToolResult`, `Done`, and so on, scoped to
/// the child's own `conversation_id`/`message_id`. None of that belongs on
/// the parent's event stream directly: the parent only ever sees that a
/// delegation started, which tools the child invoked, and how it finished.
/// This sink sits between the child `Orchestrator` and the parent's real
/// `EventSink`, translating `ToolCalls`/`ToolResult` into
/// `SubAgentToolCall`/`SubAgentToolResult` on the parent's conversation and
/// dropping everything else — the child's own `MessageStarted`,
/// `AssistantChunk`, `Done`, and the rest are internal to the delegated
/// turn and never forwarded.
pub struct SubAgentEventBridge {
    parent: Arc<dyn EventSink>,
    conversation_id: String,
    message_id: String,
    agent_id: String,
    tool_call_id: String,
}

impl SubAgentEventBridge {
    pub fn new(
        parent: Arc<dyn EventSink>,
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
        agent_id: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            parent,
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            agent_id: agent_id.into(),
            tool_call_id: tool_call_id.into(),
        }
    }
}

impl EventSink for SubAgentEventBridge {
    fn emit(&self, event: AgentEvent) {
        match event {
            AgentEvent::ToolCalls { tool_calls, .. } => {
                for call in tool_calls {
                    self.parent.emit(AgentEvent::SubAgentToolCall {
                        conversation_id: self.conversation_id.clone(),
                        message_id: self.message_id.clone(),
                        agent_id: self.agent_id.clone(),
                        tool_call_id: call.id,
                        tool_name: call.name,
                        tool_arguments: call.arguments,
                    });
                }
            }
            AgentEvent::ToolResult { result, .. } => {
                self.parent.emit(AgentEvent::SubAgentToolResult {
                    conversation_id: self.conversation_id.clone(),
                    message_id: self.message_id.clone(),
                    agent_id: self.agent_id.clone(),
                    tool_call_id: result.id,
                    tool_name: result.name,
                    duration_ms: result.duration_ms,
                    status: result.status,
                });
            }
            _ => {}
        }
    }
}
