use serde::{Deserialize, Serialize};

/// Model-facing definition of a tool: name, description, and a draft-07
/// JSON-Schema subset describing its parameters (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
    /// Read-only tools are part of the fixed auto-bypass set (spec §4.4):
    /// they execute eagerly, ahead of the approval wait, never gated.
    pub read_only: bool,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters_schema: serde_json::Value) -> Self {
        Self { name: name.into(), description: description.into(), parameters_schema, read_only: false }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}
