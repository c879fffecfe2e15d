//! Specialist agent delegation for the Kestrel agent runtime.
//!
//! A parent turn reaches for a tool that spawns a narrowly-scoped
//! specialist agent, runs it to completion against its own isolated
//! memory, and folds the result back in as a plain tool result (spec
//! §4.5). This crate owns the bookkeeping around that — depth caps,
//! timeouts, memory isolation, event translation — but never the turn
//! loop itself: see [`executor`] for why.

mod bridge;
mod error;
mod executor;
mod manager;
mod task;

pub use bridge::SubAgentEventBridge;
pub use error::SubagentError;
pub use executor::OrchestratorFactory;
pub use executor::TurnExecutor;
pub use executor::TurnOutcome;
pub use manager::SubagentManager;
pub use manager::SubagentResult;
pub use task::SubagentTask;
pub use task::DEFAULT_TIMEOUT_MS;
pub use task::MAX_DELEGATION_DEPTH;
