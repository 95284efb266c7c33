//! Request and response bodies of the Doshii reporting API

use serde::{Deserialize, Serialize};

use crate::order::{OrderStatus, Rejection, TransactionStatus};

/// Doshii's acknowledgement of a reported change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportReceipt {
    /// New version token to record
    pub version: String,
    /// Doshii id assigned to a POS-created order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doshii_id: Option<String>,
}

impl ReportReceipt {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            doshii_id: None,
        }
    }
}

/// Body of an order rejection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRejection {
    pub status: OrderStatus,
    #[serde(flatten)]
    pub rejection: Rejection,
}

impl From<Rejection> for OrderRejection {
    fn from(rejection: Rejection) -> Self {
        Self {
            status: OrderStatus::Rejected,
            rejection,
        }
    }
}

/// Body of a declined ready-to-pay / ready-to-refund
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRejection {
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub rejection: Rejection,
}

impl TransactionRejection {
    pub fn new(version: Option<String>, rejection: Rejection) -> Self {
        Self {
            status: TransactionStatus::Rejected,
            version,
            rejection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_order_rejection_body() {
        let body = OrderRejection::from(Rejection::new(
            ErrorCode::PaymentAmountMismatch,
            "bundled payment 1500 does not match total 2000",
        ));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["code"], 5001);
        assert!(json["reason"].as_str().unwrap().contains("1500"));
    }

    #[test]
    fn test_receipt_without_doshii_id() {
        let receipt: ReportReceipt = serde_json::from_str(r#"{"version":"v7"}"#).unwrap();
        assert_eq!(receipt, ReportReceipt::new("v7"));
    }
}
