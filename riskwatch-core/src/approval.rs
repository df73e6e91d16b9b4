//! Approval workflow
//!
//! `pending` is the only state from which a decision can be recorded.
//! Approved and rejected are terminal for the approval sub-state; the
//! operational status is never touched here.

use crate::error::TransitionError;
use crate::risk::{ApprovalStatus, Risk};

/// Approve a pending risk, recording the approver
pub fn approve(risk: &mut Risk, approver: &str) -> Result<(), TransitionError> {
    decide(risk, ApprovalStatus::Approved, approver, "approve")
}

/// Reject a pending risk, recording who rejected it
pub fn reject(risk: &mut Risk, approver: &str) -> Result<(), TransitionError> {
    decide(risk, ApprovalStatus::Rejected, approver, "reject")
}

/// Whether a decision can still be recorded
pub fn can_decide(risk: &Risk) -> bool {
    risk.approval_status == ApprovalStatus::Pending
}

fn decide(
    risk: &mut Risk,
    outcome: ApprovalStatus,
    approver: &str,
    attempted: &'static str,
) -> Result<(), TransitionError> {
    if !can_decide(risk) {
        return Err(TransitionError::InvalidTransition {
            risk_id: risk.id,
            from: risk.approval_status,
            attempted,
        });
    }

    risk.approval_status = outcome;
    risk.approved_by = Some(approver.to_string());

    tracing::info!(
        risk_id = risk.id,
        outcome = outcome.as_str(),
        approver,
        "approval decision recorded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{test_risk, Status};

    #[test]
    fn test_approve_pending() {
        let mut risk = test_risk(1, 5, 5);
        approve(&mut risk, "alice").unwrap();
        assert_eq!(risk.approval_status, ApprovalStatus::Approved);
        assert_eq!(risk.approved_by.as_deref(), Some("alice"));
        assert_eq!(risk.status, Status::Open);
    }

    #[test]
    fn test_reject_pending() {
        let mut risk = test_risk(1, 5, 5);
        reject(&mut risk, "bob").unwrap();
        assert_eq!(risk.approval_status, ApprovalStatus::Rejected);
        assert_eq!(risk.approved_by.as_deref(), Some("bob"));
    }

    #[test]
    fn test_second_approve_fails_and_keeps_approver() {
        let mut risk = test_risk(3, 5, 5);
        approve(&mut risk, "alice").unwrap();

        let err = approve(&mut risk, "mallory").unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                risk_id: 3,
                from: ApprovalStatus::Approved,
                attempted: "approve",
            }
        );
        assert_eq!(risk.approved_by.as_deref(), Some("alice"));
        assert_eq!(risk.approval_status, ApprovalStatus::Approved);
    }

    #[test]
    fn test_rejected_is_terminal() {
        let mut risk = test_risk(1, 5, 5);
        reject(&mut risk, "bob").unwrap();
        assert!(approve(&mut risk, "alice").is_err());
        assert!(reject(&mut risk, "carol").is_err());
        assert_eq!(risk.approval_status, ApprovalStatus::Rejected);
        assert_eq!(risk.approved_by.as_deref(), Some("bob"));
    }

    #[test]
    fn test_decision_independent_of_operational_status() {
        let mut risk = test_risk(1, 5, 5);
        risk.status = Status::Resolved;
        assert!(can_decide(&risk));
        approve(&mut risk, "alice").unwrap();
        assert_eq!(risk.status, Status::Resolved);
    }
}
