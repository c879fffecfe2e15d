use kestrel_protocol::AgentConfig;

/// Default invocation timeout (spec §4.5: "default 3,000,000" ms, 50
/// minutes).
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000_000;

/// Maximum delegation depth: an invocation carrying this depth or deeper
/// is rejected before it starts (spec §4.5, §8: "for any delegation chain
/// of length >= 3").
pub const MAX_DELEGATION_DEPTH: u32 = 3;

/// One request to spawn and run a specialist agent to completion (spec
/// §4.5). Bundles the fields spec §4.5 describes as "carried" by an
/// invocation alongside the `AgentConfig` it wraps.
#[derive(Debug, Clone)]
pub struct SubagentTask {
    pub config: AgentConfig,
    pub agent_name: String,
    pub prompt: String,
    pub delegation_depth: u32,
    pub timeout_ms: u64,
    pub share_context: bool,
    /// The parent tool-call id this sub-agent is servicing, carried on
    /// `SubAgentStarted` so the presentation layer can correlate it with
    /// the proposing `ToolCalls` event.
    pub tool_call_id: String,
}

impl SubagentTask {
    pub fn new(config: AgentConfig, agent_name: impl Into<String>, prompt: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            config,
            agent_name: agent_name.into(),
            prompt: prompt.into(),
            delegation_depth: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            share_context: false,
            tool_call_id: tool_call_id.into(),
        }
    }
}
