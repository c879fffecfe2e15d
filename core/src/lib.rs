//! Orchestrator: the turn loop that ties every other Kestrel crate
//! together (spec §4.2).
//!
//! Everything else in the workspace is a collaborator this crate calls
//! through a trait object or a thin wrapper type — the model backend, the
//! tool registry, the approval router, the reminder engine, the metrics
//! counters, and (via [`factory::CoreOrchestratorFactory`]) itself again
//! for specialist sub-agents.

mod delegate_tool;
mod error;
mod factory;
mod options;
mod orchestrator;
mod runtime;

pub use delegate_tool::DelegateTool;
pub use delegate_tool::DELEGATE_TOOL_NAME;
pub use error::OrchestratorError;
pub use factory::CoreOrchestratorFactory;
pub use options::MessageResponse;
pub use options::SendOptions;
pub use orchestrator::Orchestrator;
pub use runtime::Runtime;
