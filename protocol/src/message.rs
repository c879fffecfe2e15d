use serde::{Deserialize, Serialize};

use crate::error::ErrorReason;
use crate::tool::ToolCall;

/// Role of a message within a conversation (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One part of a multi-part message body: either plain text or an
/// embedded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { data: String, mime_type: String, alt_text: Option<String> },
}

/// Body of a message: a plain string, absent (`null`), or an ordered list
/// of parts (spec §3 — needed once image attachments interleave with
/// text at specific token positions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Null,
}

impl MessageContent {
    /// Best-effort flattening to a single string, used for logging and for
    /// providers that only accept a plain string body.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Null => String::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MessageContent::Null)
    }
}

/// Outcome of an executed tool call, as recorded on a tool message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMessageStatus {
    Success,
    Error,
}

/// Structured metadata carried on a tool message (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,
}

/// A single persisted entry in a conversation's message log.
///
/// Append-only within a conversation (invariant 1, spec §3): nothing in
/// this crate mutates a `Message` once it has been appended to a
/// `MemoryStore` — callers construct a fresh value instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: MessageContent,
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Present only on assistant messages that proposed tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Present only on tool messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolMessageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolMessageMetadata>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
            timestamp: chrono::Utc::now(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            status: None,
            duration_ms: None,
            metadata: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
            timestamp: chrono::Utc::now(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            status: None,
            duration_ms: None,
            metadata: None,
        }
    }

    pub fn user_with_content(content: MessageContent) -> Self {
        Self {
            id: crate::new_id(),
            role: MessageRole::User,
            content,
            timestamp: chrono::Utc::now(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            status: None,
            duration_ms: None,
            metadata: None,
        }
    }

    pub fn assistant(id: impl Into<String>, content: MessageContent) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content,
            timestamp: chrono::Utc::now(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            status: None,
            duration_ms: None,
            metadata: None,
        }
    }

    pub fn assistant_with_tool_calls(
        id: impl Into<String>,
        content: MessageContent,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        let mut msg = Self::assistant(id, content);
        msg.tool_calls = Some(tool_calls);
        msg
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: MessageContent,
        status: ToolMessageStatus,
        duration_ms: u64,
        error_reason: Option<ErrorReason>,
    ) -> Self {
        Self {
            id: crate::new_id(),
            role: MessageRole::Tool,
            content,
            timestamp: chrono::Utc::now(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            status: Some(status),
            duration_ms: Some(duration_ms),
            metadata: error_reason.map(|error_reason| ToolMessageMetadata {
                error_reason: Some(error_reason),
            }),
        }
    }
}

/// One image attachment supplied alongside a user's text, optionally
/// anchored to a `token` substring marking its desired position (spec
/// §4.2, step 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub data: String,
    pub mime_type: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Input to `Orchestrator::send`: either a bare string or a structured
/// payload carrying a display variant and attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserPayload {
    Text(String),
    Structured {
        text: String,
        #[serde(default)]
        display_text: Option<String>,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
}

impl UserPayload {
    pub fn text(&self) -> &str {
        match self {
            UserPayload::Text(t) => t,
            UserPayload::Structured { text, .. } => text,
        }
    }

    pub fn display_text(&self) -> &str {
        match self {
            UserPayload::Text(t) => t,
            UserPayload::Structured { text, display_text, .. } => {
                display_text.as_deref().unwrap_or(text)
            }
        }
    }

    pub fn attachments(&self) -> &[Attachment] {
        match self {
            UserPayload::Text(_) => &[],
            UserPayload::Structured { attachments, .. } => attachments,
        }
    }
}

impl From<&str> for UserPayload {
    fn from(value: &str) -> Self {
        UserPayload::Text(value.to_string())
    }
}

impl From<String> for UserPayload {
    fn from(value: String) -> Self {
        UserPayload::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_text_parts_and_skips_images() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "before ".into() },
            ContentPart::Image {
                data: "base64==".into(),
                mime_type: "image/png".into(),
                alt_text: None,
            },
            ContentPart::Text { text: "after".into() },
        ]);
        assert_eq!(content.as_text(), "before after");
    }

    #[test]
    fn structured_payload_prefers_display_text() {
        let payload = UserPayload::Structured {
            text: "raw".into(),
            display_text: Some("pretty".into()),
            attachments: vec![],
        };
        assert_eq!(payload.text(), "raw");
        assert_eq!(payload.display_text(), "pretty");
    }

    #[test]
    fn message_round_trips_through_json() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
