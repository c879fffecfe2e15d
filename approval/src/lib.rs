//! Tool Approval Protocol: correlates `ToolApprovalRequired` emissions
//! with their eventual policy-layer resolution (spec §4.4).

mod decision;
mod error;
mod router;

pub use decision::ApprovalDecision;
pub use decision::ApprovalOutcome;
pub use error::ApprovalError;
pub use router::partition_bypassed;
pub use router::ApprovalRouter;
