use thiserror::Error;

/// Internal failure surface for one sub-agent invocation. Per spec §7
/// these never escape as raised exceptions to the parent turn — they are
/// mapped into a `SubagentResult` with `status=Error` instead.
#[derive(Debug, Error)]
pub enum SubagentError {
    #[error("sub-agent turn failed: {0}")]
    TurnFailed(String),
}
