use async_trait::async_trait;
use kestrel_protocol::Message;

use crate::error::MetricsError;

/// Produces a short summary of a conversation's history when the context
/// window is nearly exhausted (spec §4.7). The actual history-replacement
/// (or new-session) action is the orchestrator's responsibility — this
/// trait only owns turning messages into prose.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, history: &[Message]) -> Result<String, MetricsError>;
}
