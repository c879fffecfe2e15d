use async_trait::async_trait;
use kestrel_protocol::ToolExecutionResult;
use tokio_util::sync::CancellationToken;

use crate::spec::ToolSpec;

/// Context passed to every tool invocation: identifies the conversation
/// and delegation depth the call is running under (spec §4.3, §4.5).
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub conversation_id: String,
    /// The turn's `messageId` this call was proposed under (spec §6);
    /// tools that themselves emit correlated events (e.g. a delegation
    /// tool spawning a sub-agent, spec §4.5) need it to stamp
    /// `SubAgent*` events on the right turn.
    pub message_id: String,
    pub delegation_depth: u32,
    /// Set only when the approval protocol resolved the call with
    /// `decision=edit` (spec §4.4); tools interpret this however fits
    /// their own parameters (e.g. rewriting a file path).
    pub edit_instruction: Option<String>,
}

impl ToolContext {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: String::new(),
            delegation_depth: 0,
            edit_instruction: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }
}

/// One executable capability the orchestrator can dispatch a `ToolCall`
/// to (spec §4.3). Implementations live entirely outside this crate —
/// only the execution contract is specified here (spec §1).
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    fn is_read_only(&self) -> bool {
        self.spec().read_only
    }

    /// Runs the tool. `params` is the already-JSON-decoded `arguments`
    /// string from the originating `ToolCall`. Implementations must
    /// observe `cancel` and return promptly with an `Aborted` result when
    /// it fires (spec §4.3, §5).
    async fn execute(
        &self,
        id: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
        cancel: CancellationToken,
    ) -> ToolExecutionResult;
}
