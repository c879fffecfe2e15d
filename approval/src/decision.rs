use kestrel_protocol::ToolCall;

/// The policy layer's resolution of one `ToolApprovalRequired` event
/// (spec §4.4).
#[derive(Debug, Clone)]
pub enum ApprovalDecision {
    /// Resume with `calls` (possibly a subset of, or edits to, the
    /// originally proposed calls). `approve` and `approve_all` share this
    /// shape — the distinction is cosmetic for the policy layer's UI.
    Approve { calls: Vec<ToolCall> },
    /// Reject the whole batch; the orchestrator records a denial turn.
    Deny,
    /// Resume with a textual instruction attached to every awaiting call.
    Edit { calls: Vec<ToolCall>, instruction: String },
}

/// Outcome handed back to the orchestrator once a pending approval
/// resolves, normalised to "run these calls" or "denied".
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    Proceed { calls: Vec<ToolCall>, edit_instruction: Option<String> },
    Denied,
}

impl From<ApprovalDecision> for ApprovalOutcome {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approve { calls } => ApprovalOutcome::Proceed { calls, edit_instruction: None },
            ApprovalDecision::Deny => ApprovalOutcome::Denied,
            ApprovalDecision::Edit { calls, instruction } => {
                ApprovalOutcome::Proceed { calls, edit_instruction: Some(instruction) }
            }
        }
    }
}
