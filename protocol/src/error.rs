use serde::{Deserialize, Serialize};

/// Closed taxonomy of tool and internal failure causes.
///
/// Carried on `ToolExecutionResult.metadata.error_reason` and used
/// internally wherever an operation needs to classify why it failed
/// without escaping as a raised exception (spec §7). Closed deliberately:
/// a new failure mode is a reviewable addition here, not a free-form
/// string a consumer has to pattern-match by substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// Tool parameters fail basic type checks.
    InvalidInput,
    /// JSON-schema validation of the tool's declared parameter schema failed.
    ValidationFailed,
    /// Tool name or target resource does not exist.
    NotFound,
    /// User (or policy layer) rejected the call via the approval protocol.
    Denied,
    /// A bounded operation exceeded its time budget.
    Timeout,
    /// A cancellation signal fired before the operation completed.
    Aborted,
    /// Unclassified; the accompanying message carries a human-readable cause.
    Unknown,
}

impl ErrorReason {
    /// Short human-facing label, used when synthesizing tool error text.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::InvalidInput => "invalid_input",
            ErrorReason::ValidationFailed => "validation_failed",
            ErrorReason::NotFound => "not_found",
            ErrorReason::Denied => "denied",
            ErrorReason::Timeout => "timeout",
            ErrorReason::Aborted => "aborted",
            ErrorReason::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        for reason in [
            ErrorReason::InvalidInput,
            ErrorReason::ValidationFailed,
            ErrorReason::NotFound,
            ErrorReason::Denied,
            ErrorReason::Timeout,
            ErrorReason::Aborted,
            ErrorReason::Unknown,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            let back: ErrorReason = serde_json::from_str(&json).unwrap();
            assert_eq!(reason, back);
        }
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ErrorReason::ValidationFailed).unwrap();
        assert_eq!(json, "\"validation_failed\"");
    }
}
