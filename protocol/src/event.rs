use serde::{Deserialize, Serialize};

use crate::message::MessageContent;
use crate::tool::{ToolCall, ToolExecutionResult};

/// Normalised token accounting for one model call (spec §4.6).
///
/// Backends report either `prompt_tokens`/`completion_tokens` or
/// `input_tokens`/`output_tokens`; the orchestrator normalises to this
/// shape once, computing `total_tokens` as the sum when the backend
/// didn't supply it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
    }
}

/// Terminal status of a sub-agent invocation, carried on
/// `SubAgentCompleted` (spec §4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubAgentStatus {
    Success,
    Error,
    Timeout,
}

/// The tagged union of progress events streamed to a presentation layer
/// (spec §6). Closed deliberately — see the crate-level note on
/// `ErrorReason` for the rationale shared by every wire-visible enum here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    MessageStarted {
        conversation_id: String,
        message_id: String,
        user_content: MessageContent,
        enhanced: Vec<String>,
        tool_names: Vec<String>,
    },
    AssistantChunk {
        conversation_id: String,
        message_id: String,
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    ReasoningChunk {
        conversation_id: String,
        message_id: String,
        delta: String,
    },
    StreamFinish {
        conversation_id: String,
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    ToolCalls {
        conversation_id: String,
        message_id: String,
        tool_calls: Vec<ToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    ToolApprovalRequired {
        conversation_id: String,
        message_id: String,
        tool_calls: Vec<ToolCall>,
        approval_id: String,
    },
    ToolResult {
        conversation_id: String,
        message_id: String,
        result: ToolExecutionResult,
    },
    AssistantMessage {
        conversation_id: String,
        message_id: String,
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    MemoryAppended {
        conversation_id: String,
        delta: Vec<crate::message::Message>,
    },
    SubAgentStarted {
        conversation_id: String,
        message_id: String,
        agent_id: String,
        agent_name: String,
        tool_call_id: String,
    },
    SubAgentToolCall {
        conversation_id: String,
        message_id: String,
        agent_id: String,
        tool_call_id: String,
        tool_name: String,
        tool_arguments: String,
    },
    SubAgentToolResult {
        conversation_id: String,
        message_id: String,
        agent_id: String,
        tool_call_id: String,
        tool_name: String,
        duration_ms: u64,
        status: crate::message::ToolMessageStatus,
    },
    SubAgentCompleted {
        conversation_id: String,
        message_id: String,
        agent_id: String,
        agent_name: String,
        status: SubAgentStatus,
        result_message: String,
        total_duration_ms: u64,
    },
    Done {
        conversation_id: String,
        message_id: String,
        response_time_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    Error {
        conversation_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        error: String,
    },
}

impl AgentEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            AgentEvent::MessageStarted { conversation_id, .. }
            | AgentEvent::AssistantChunk { conversation_id, .. }
            | AgentEvent::ReasoningChunk { conversation_id, .. }
            | AgentEvent::StreamFinish { conversation_id, .. }
            | AgentEvent::ToolCalls { conversation_id, .. }
            | AgentEvent::ToolApprovalRequired { conversation_id, .. }
            | AgentEvent::ToolResult { conversation_id, .. }
            | AgentEvent::AssistantMessage { conversation_id, .. }
            | AgentEvent::MemoryAppended { conversation_id, .. }
            | AgentEvent::SubAgentStarted { conversation_id, .. }
            | AgentEvent::SubAgentToolCall { conversation_id, .. }
            | AgentEvent::SubAgentToolResult { conversation_id, .. }
            | AgentEvent::SubAgentCompleted { conversation_id, .. }
            | AgentEvent::Done { conversation_id, .. }
            | AgentEvent::Error { conversation_id, .. } => conversation_id,
        }
    }

    /// True for the two tags that legally terminate a turn's event stream
    /// (spec §8: "the final emitted event is exactly one of Done or Error").
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done { .. } | AgentEvent::Error { .. })
    }
}

/// Sink that progress events are published to. Implemented by whatever
/// presentation layer embeds this runtime (spec §1: the TUI is out of
/// scope, only this contract matters here).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_and_error_are_terminal() {
        let done = AgentEvent::Done {
            conversation_id: "c".into(),
            message_id: "m".into(),
            response_time_ms: 1,
            usage: None,
        };
        let error = AgentEvent::Error { conversation_id: "c".into(), message_id: None, error: "x".into() };
        let started = AgentEvent::MessageStarted {
            conversation_id: "c".into(),
            message_id: "m".into(),
            user_content: MessageContent::Text("hi".into()),
            enhanced: vec![],
            tool_names: vec![],
        };
        assert!(done.is_terminal());
        assert!(error.is_terminal());
        assert!(!started.is_terminal());
    }

    #[test]
    fn usage_total_is_sum() {
        let usage = Usage::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
    }
}
