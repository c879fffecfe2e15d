use serde::{Deserialize, Serialize};

/// Hint forwarded to model backends that support a reasoning-effort knob
/// (spec §6, configuration option `thinking`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingLevel {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

/// Per-agent configuration (spec §3 `AgentConfig`).
///
/// Every tunable named in spec §6 ("Configuration (recognized options)")
/// is a plain field here with the documented default; this crate does not
/// parse configuration files or CLI arguments (spec §1, out of scope) —
/// an embedding application constructs this value however it parses its
/// own config surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub reasoning_effort: Option<ThinkingLevel>,
    pub model: String,
    pub enabled_tools: Vec<String>,
    #[serde(default = "default_max_tool_concurrency")]
    pub max_tool_concurrency: usize,
    #[serde(default = "default_require_tool_approval")]
    pub require_tool_approval: bool,
    #[serde(default)]
    pub strict_tool_validation: bool,
}

fn default_max_tool_concurrency() -> usize {
    3
}

fn default_require_tool_approval() -> bool {
    true
}

impl AgentConfig {
    /// A config with every documented default applied, for callers who
    /// only need to override a handful of fields.
    pub fn new(id: impl Into<String>, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 4096,
            reasoning_effort: None,
            model: model.into(),
            enabled_tools: Vec::new(),
            max_tool_concurrency: default_max_tool_concurrency(),
            require_tool_approval: default_require_tool_approval(),
            strict_tool_validation: false,
        }
    }
}

/// Per-conversation bookkeeping maintained alongside the message log
/// (spec §3 `ConversationMetadata`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub message_count: usize,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub total_prompt_tokens: u64,
    #[serde(default)]
    pub total_completion_tokens: u64,
    #[serde(default)]
    pub estimated_cost_usd: f64,
    #[serde(default)]
    pub summarized_from: Option<String>,
}

impl ConversationMetadata {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            message_count: 0,
            topic: None,
            total_prompt_tokens: 0,
            total_completion_tokens: 0,
            estimated_cost_usd: 0.0,
            summarized_from: None,
        }
    }
}

impl Default for ConversationMetadata {
    fn default() -> Self {
        Self::new()
    }
}
