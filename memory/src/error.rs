use thiserror::Error;

/// Internal failure surface for this crate's operations.
///
/// `get`/`keys` never fail (spec §4.1); every other operation that can
/// fail (serialization, disk I/O) surfaces one of these. None of these
/// variants escape to the orchestrator as a raised exception on their
/// own — callers map them to `ErrorReason::Unknown` or an `Error` event.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to read memory snapshot at {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to write memory snapshot at {path}: {source}")]
    Write { path: String, #[source] source: std::io::Error },
    #[error("failed to (de)serialize memory snapshot: {0}")]
    Serde(#[from] serde_json::Error),
}
