//! Typed errors for conditions callers are expected to match on
//!
//! IO and serialization plumbing stays on `anyhow`; these types cover the
//! domain failures that must be surfaced to an operator as-is.

use crate::risk::ApprovalStatus;
use thiserror::Error;

/// A field-level rule violated while creating or updating a risk
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("{field} must be between 1 and 10 (got {value})")]
    OutOfRange { field: &'static str, value: i64 },
    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },
    #[error("project_id must be positive (got {0})")]
    InvalidProject(i64),
    #[error("{0} must not be empty")]
    Blank(&'static str),
}

/// Approval workflow rejected the requested transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {attempted} risk {risk_id}: approval status is already {from}")]
    InvalidTransition {
        risk_id: i64,
        from: ApprovalStatus,
        attempted: &'static str,
    },
}

/// Failures at the store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("risk {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_operator_readable() {
        let err = ValidationError::OutOfRange {
            field: "probability",
            value: 11,
        };
        assert_eq!(err.to_string(), "probability must be between 1 and 10 (got 11)");

        let err = TransitionError::InvalidTransition {
            risk_id: 7,
            from: ApprovalStatus::Approved,
            attempted: "approve",
        };
        assert_eq!(
            err.to_string(),
            "cannot approve risk 7: approval status is already approved"
        );
    }

    #[test]
    fn test_store_error_wraps_domain_errors() {
        let err: StoreError = ValidationError::EmptyTitle.into();
        assert!(matches!(err, StoreError::Validation(ValidationError::EmptyTitle)));
        assert_eq!(StoreError::NotFound(3).to_string(), "risk 3 not found");
    }
}
