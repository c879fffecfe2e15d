use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use kestrel_protocol::{Message, MessageContent, ThinkingLevel, ToolCall, Usage};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ModelError;
use crate::merge::ToolCallFragment;

/// Model-facing tool definition handed to `ModelBackend` implementations.
/// Mirrors `kestrel_tools::ToolSpec`'s public fields without the
/// `read_only` flag, which is a bypass-routing concern the backend has no
/// business seeing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// Input to one completion call (spec §4.6).
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub reasoning_effort: Option<ThinkingLevel>,
}

/// Result of a (non-streaming) completion call.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub content: MessageContent,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

impl CompletionResult {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One event out of a streaming completion (spec §4.2 step 6a, §4.6).
/// Modeled as a finite lazy sequence rather than callbacks (spec §9
/// design notes: "the Model Backend returns a finite lazy sequence of
/// chunk events; the orchestrator iterates and emits downstream events
/// synchronously").
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    ReasoningDelta(String),
    ToolCallDelta(ToolCallFragment),
    Finish { finish_reason: Option<String>, usage: Option<Usage> },
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// External collaborator interface to a concrete model vendor (spec §1,
/// §4.6). The HTTP transport, auth, retries, and wire format are
/// deliberately out of scope — only this contract matters here.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate_completion(
        &self,
        params: &CompletionParams,
        cancel: CancellationToken,
    ) -> Result<CompletionResult, ModelError>;

    /// Default implementation opts a backend out of streaming; backends
    /// that support it override this (spec §4.6: "optional").
    async fn stream_completion(
        &self,
        _params: &CompletionParams,
        _cancel: CancellationToken,
    ) -> Result<CompletionStream, ModelError> {
        Err(ModelError::StreamingUnsupported)
    }

    /// Whether `stream_completion` is meaningfully implemented; the
    /// orchestrator falls back to the non-streaming path when false even
    /// if the caller asked for `stream=true` (spec §4.2 step 6a).
    fn supports_streaming(&self) -> bool {
        false
    }
}
