//! Shared data model and wire types for the Kestrel agent runtime.
//!
//! This crate has no runtime logic of its own: it defines the `Message`,
//! `ToolCall`, `AgentConfig`, and `AgentEvent` types every other crate in
//! the workspace builds against, plus the closed `ErrorReason` enum that
//! both tool results and internal failures map onto.

mod config;
mod error;
mod event;
mod message;
mod tool;

pub use config::AgentConfig;
pub use config::ConversationMetadata;
pub use config::ThinkingLevel;
pub use error::ErrorReason;
pub use event::AgentEvent;
pub use event::EventSink;
pub use event::SubAgentStatus;
pub use event::Usage;
pub use message::Attachment;
pub use message::ContentPart;
pub use message::Message;
pub use message::MessageContent;
pub use message::MessageRole;
pub use message::ToolMessageStatus;
pub use message::UserPayload;
pub use tool::ToolCall;
pub use tool::ToolExecutionResult;
pub use tool::ToolResultType;

/// Generates a fresh opaque id for messages, tool calls, and approvals.
///
/// Every id-bearing type in this crate is a plain `String`, not a newtype,
/// because ids cross process/transport boundaries (event stream, snapshot
/// JSON) where a bespoke wrapper buys nothing but `serde` ceremony.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
