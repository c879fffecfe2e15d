//! Model Backend integration surface: the non-streaming/streaming
//! completion contract plus the tooling the orchestrator owns around it
//! — tool-call fragment merging and usage normalisation (spec §4.6).

mod backend;
mod error;
mod merge;
mod usage;

pub use backend::CompletionParams;
pub use backend::CompletionResult;
pub use backend::CompletionStream;
pub use backend::ModelBackend;
pub use backend::StreamEvent;
pub use backend::ToolDefinition;
pub use error::ModelError;
pub use merge::ToolCallAccumulator;
pub use merge::ToolCallFragment;
pub use usage::RawUsage;
