use kestrel_protocol::{MessageContent, Usage};
use tokio_util::sync::CancellationToken;

/// Options recognised by `Orchestrator::send` (spec §4.2).
#[derive(Clone)]
pub struct SendOptions {
    pub conversation_id: String,
    pub stream: bool,
    pub signal: CancellationToken,
}

impl SendOptions {
    pub fn new() -> Self {
        Self { conversation_id: "default".to_string(), stream: false, signal: CancellationToken::new() }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = signal;
        self
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Final content produced by one `send` call, mirroring what the turn's
/// last `AssistantMessage`/`Done` event pair carried.
#[derive(Debug, Clone)]
pub struct MessageResponse {
    pub message_id: String,
    pub content: MessageContent,
    pub usage: Option<Usage>,
}
