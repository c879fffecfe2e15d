use serde::{Deserialize, Serialize};

use crate::error::ErrorReason;

/// A tool invocation proposed by the model (spec §3).
///
/// `arguments` is kept as the raw JSON-encoded string the model produced,
/// never eagerly parsed: streaming backends deliver it in fragments that
/// must be concatenated byte-for-byte before a single JSON decode at
/// execution time (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Shape of `ToolExecutionResult.result`: plain text or a structured JSON
/// value, selected by the tool itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultType {
    Text,
    Json,
}

/// Structured metadata attached to a `ToolExecutionResult`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,
}

/// Outcome of executing one `ToolCall` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub id: String,
    pub name: String,
    pub status: crate::message::ToolMessageStatus,
    #[serde(rename = "type")]
    pub result_type: ToolResultType,
    pub result: serde_json::Value,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolResultMetadata>,
}

impl ToolExecutionResult {
    pub fn text_ok(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: crate::message::ToolMessageStatus::Success,
            result_type: ToolResultType::Text,
            result: serde_json::Value::String(text.into()),
            duration_ms,
            metadata: None,
        }
    }

    pub fn json_ok(id: impl Into<String>, name: impl Into<String>, value: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: crate::message::ToolMessageStatus::Success,
            result_type: ToolResultType::Json,
            result: value,
            duration_ms,
            metadata: None,
        }
    }

    pub fn error(
        id: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
        reason: ErrorReason,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: crate::message::ToolMessageStatus::Error,
            result_type: ToolResultType::Text,
            result: serde_json::Value::String(message.into()),
            duration_ms,
            metadata: Some(ToolResultMetadata { error_reason: Some(reason) }),
        }
    }

    /// Best-effort flattening of `result` to a string, used when feeding the
    /// result back into a provider message's tool content.
    pub fn result_as_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn error_reason(&self) -> Option<ErrorReason> {
        self.metadata.as_ref().and_then(|m| m.error_reason)
    }
}
