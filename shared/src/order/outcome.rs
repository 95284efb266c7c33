//! Decisions taken on inbound Doshii orders
//!
//! Outcomes outlive the order itself so that a redelivered creation event
//! is recognised, and an unreported decision can be resent unchanged.

use super::snapshot::OrderStatus;
use crate::error::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};

/// Rejection code and reason reported to Doshii
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rejection {
    pub code: ErrorCode,
    pub reason: String,
}

impl Rejection {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl From<&AppError> for Rejection {
    fn from(err: &AppError) -> Self {
        Self::new(err.code, err.message.clone())
    }
}

/// Outcome of an inbound order, keyed by Doshii order id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderOutcome {
    pub doshii_id: String,
    /// POS id assigned on acceptance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_id: Option<String>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    /// Whether Doshii has acknowledged the decision
    #[serde(default)]
    pub reported: bool,
    pub decided_at: i64,
}

impl OrderOutcome {
    pub fn accepted(doshii_id: impl Into<String>, pos_id: impl Into<String>) -> Self {
        Self {
            doshii_id: doshii_id.into(),
            pos_id: Some(pos_id.into()),
            status: OrderStatus::Accepted,
            rejection: None,
            reported: false,
            decided_at: crate::util::now_millis(),
        }
    }

    pub fn rejected(doshii_id: impl Into<String>, rejection: Rejection) -> Self {
        Self {
            doshii_id: doshii_id.into(),
            pos_id: None,
            status: OrderStatus::Rejected,
            rejection: Some(rejection),
            reported: false,
            decided_at: crate::util::now_millis(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status == OrderStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_from_app_error() {
        let err = AppError::with_message(ErrorCode::PaymentAmountMismatch, "owing 2000, got 1500");
        let rejection = Rejection::from(&err);
        assert_eq!(rejection.code, ErrorCode::PaymentAmountMismatch);
        assert_eq!(rejection.reason, "owing 2000, got 1500");
    }

    #[test]
    fn test_outcome_constructors() {
        let accepted = OrderOutcome::accepted("d-1", "1001");
        assert_eq!(accepted.pos_id.as_deref(), Some("1001"));
        assert!(!accepted.reported);
        assert!(!accepted.is_rejected());

        let rejected = OrderOutcome::rejected(
            "d-2",
            Rejection::new(ErrorCode::OrderRejectedByPolicy, "kitchen closed"),
        );
        assert!(rejected.is_rejected());
        assert!(rejected.pos_id.is_none());

        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["rejection"]["code"], 4005);
        assert_eq!(json["status"], "rejected");
    }
}
