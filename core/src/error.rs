use thiserror::Error;

use kestrel_approval::ApprovalError;
use kestrel_model::ModelError;

/// Internal failure surface for one `Orchestrator::send` call.
///
/// Per spec §7 these never propagate past `send` as a panic: every
/// variant here is emitted as an `Error` event before `send` returns
/// `Err` (spec: "no exception escapes the `send` call except the
/// special case of catastrophic internal bugs" — `Result` is this
/// workspace's idiomatic stand-in for that distinction, not a panic).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("turn was aborted")]
    Aborted,
    #[error("model backend error: {0}")]
    Model(#[from] ModelError),
    #[error("tool loop exceeded the safety cap of {0} iterations")]
    DepthExceeded(u32),
    #[error("memory store error: {0}")]
    Memory(String),
    #[error("{0}")]
    Unknown(String),
}

impl From<ApprovalError> for OrchestratorError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::Aborted => OrchestratorError::Aborted,
            other => OrchestratorError::Unknown(other.to_string()),
        }
    }
}
