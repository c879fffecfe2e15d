use dashmap::DashMap;
use kestrel_protocol::ToolCall;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::decision::{ApprovalDecision, ApprovalOutcome};
use crate::error::ApprovalError;

/// Correlates one `ToolApprovalRequired` emission with its eventual
/// `handle_tool_approval` resolution via a one-shot channel per id (spec
/// §4.4, §9 design notes).
///
/// Scoped to a single `Orchestrator` instance, not global (spec §5: "the
/// pending-approval table is a per-orchestrator map"). `DashMap::remove`
/// is what makes "resolved at most once" and "unknown id is a benign
/// no-op" hold: the first resolution removes the entry, so a second call
/// with the same id finds nothing and is itself a no-op.
pub struct ApprovalRouter {
    pending: DashMap<String, oneshot::Sender<ApprovalDecision>>,
}

impl ApprovalRouter {
    pub fn new() -> Self {
        Self { pending: DashMap::new() }
    }

    /// Registers a new pending approval and returns its id plus the
    /// receiver the orchestrator should await.
    pub fn begin(&self, approval_id: impl Into<String>) -> oneshot::Receiver<ApprovalDecision> {
        let (tx, rx) = oneshot::channel();
        let approval_id = approval_id.into();
        self.pending.insert(approval_id, tx);
        rx
    }

    /// Resolves a pending approval exactly once. An unknown id (already
    /// resolved, or never issued) logs and returns `false` rather than
    /// erroring — "benign no-op" per spec §4.4.
    pub fn resolve(&self, approval_id: &str, decision: ApprovalDecision) -> bool {
        match self.pending.remove(approval_id) {
            Some((_, sender)) => {
                info!(approval_id, "resolving tool approval");
                // A closed receiver means the orchestrator's turn already
                // aborted; nothing to deliver to.
                let _ = sender.send(decision);
                true
            }
            None => {
                warn!(approval_id, "no pending approval for id, ignoring");
                false
            }
        }
    }

    /// Awaits a resolution for `approval_id`, racing the cancellation
    /// token (spec §5: approval waits that outlive the signal resolve as
    /// `Aborted`).
    pub async fn await_decision(
        &self,
        approval_id: &str,
        rx: oneshot::Receiver<ApprovalDecision>,
        cancel: CancellationToken,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.pending.remove(approval_id);
                Err(ApprovalError::Aborted)
            }
            result = rx => {
                match result {
                    Ok(decision) => Ok(decision.into()),
                    Err(_) => Err(ApprovalError::ChannelClosed),
                }
            }
        }
    }
}

impl Default for ApprovalRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits proposed tool calls into the auto-bypass subset and the subset
/// that must wait for approval (spec §4.4), given a predicate describing
/// the registry's bypass set.
pub fn partition_bypassed(calls: &[ToolCall], is_bypassed: impl Fn(&str) -> bool) -> (Vec<ToolCall>, Vec<ToolCall>) {
    let mut bypassed = Vec::new();
    let mut gated = Vec::new();
    for call in calls {
        if is_bypassed(&call.name) {
            bypassed.push(call.clone());
        } else {
            gated.push(call.clone());
        }
    }
    (bypassed, gated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall { id: id.into(), name: name.into(), arguments: "{}".into() }
    }

    #[test]
    fn partitions_by_predicate() {
        let calls = vec![call("1", "read_file"), call("2", "shell")];
        let (bypassed, gated) = partition_bypassed(&calls, |name| name == "read_file");
        assert_eq!(bypassed.len(), 1);
        assert_eq!(gated.len(), 1);
        assert_eq!(bypassed[0].name, "read_file");
    }

    #[tokio::test]
    async fn approve_resolves_pending_wait() {
        let router = ApprovalRouter::new();
        let rx = router.begin("a1");
        let resolved = router.resolve("a1", ApprovalDecision::Approve { calls: vec![call("1", "shell")] });
        assert!(resolved);
        let outcome = router.await_decision("a1", rx, CancellationToken::new()).await.unwrap();
        match outcome {
            ApprovalOutcome::Proceed { calls, edit_instruction } => {
                assert_eq!(calls.len(), 1);
                assert!(edit_instruction.is_none());
            }
            ApprovalOutcome::Denied => panic!("expected proceed"),
        }
    }

    #[tokio::test]
    async fn deny_surfaces_as_denied_outcome() {
        let router = ApprovalRouter::new();
        let rx = router.begin("a1");
        router.resolve("a1", ApprovalDecision::Deny);
        let outcome = router.await_decision("a1", rx, CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Denied));
    }

    #[test]
    fn unknown_id_resolution_is_benign_no_op() {
        let router = ApprovalRouter::new();
        let resolved = router.resolve("does-not-exist", ApprovalDecision::Deny);
        assert!(!resolved);
    }

    #[test]
    fn second_resolution_for_same_id_is_no_op() {
        let router = ApprovalRouter::new();
        let _rx = router.begin("a1");
        assert!(router.resolve("a1", ApprovalDecision::Deny));
        assert!(!router.resolve("a1", ApprovalDecision::Deny));
    }

    #[tokio::test]
    async fn cancellation_aborts_wait() {
        let router = ApprovalRouter::new();
        let rx = router.begin("a1");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = router.await_decision("a1", rx, cancel).await;
        assert!(matches!(result, Err(ApprovalError::Aborted)));
    }
}
