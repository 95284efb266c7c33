//! Payment transactions (captures and refunds)

use serde::{Deserialize, Serialize};

/// Transaction status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Requested by the partner, not yet confirmed by the POS
    #[default]
    Pending,
    /// POS confirmed the amount; waiting for capture
    Waiting,
    /// Funds captured (or refunded)
    Complete,
    Rejected,
}

/// Capture (amount ≥ 0) or refund (amount < 0) against a POS order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    /// POS order id, or the Doshii order id when the partner only knows that
    pub order_id: String,
    /// Signed amount in cents
    pub amount: i64,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub accept_less: bool,
    #[serde(default)]
    pub partner_initiated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Captures this refund is drawn against
    #[serde(default)]
    pub linked_trx_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Transaction {
    pub fn capture(id: impl Into<String>, order_id: impl Into<String>, amount: i64) -> Self {
        Self {
            id: id.into(),
            order_id: order_id.into(),
            amount,
            status: TransactionStatus::Pending,
            accept_less: false,
            partner_initiated: true,
            version: None,
            linked_trx_ids: Vec::new(),
            reference: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn refund(
        id: impl Into<String>,
        order_id: impl Into<String>,
        amount: i64,
        linked_trx_ids: Vec<String>,
    ) -> Self {
        Self {
            linked_trx_ids,
            ..Self::capture(id, order_id, amount)
        }
    }

    pub fn is_refund(&self) -> bool {
        self.amount < 0
    }

    /// Completed capture
    pub fn is_captured(&self) -> bool {
        self.status == TransactionStatus::Complete && self.amount >= 0
    }

    /// Completed refund
    pub fn is_refunded(&self) -> bool {
        self.status == TransactionStatus::Complete && self.amount < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_helpers() {
        let mut capture = Transaction::capture("t1", "1001", 2000);
        assert!(!capture.is_refund());
        assert!(!capture.is_captured());
        capture.status = TransactionStatus::Complete;
        assert!(capture.is_captured());

        let mut refund = Transaction::refund("t2", "1001", -500, vec!["t1".into()]);
        assert!(refund.is_refund());
        refund.status = TransactionStatus::Complete;
        assert!(refund.is_refunded());
        assert!(!refund.is_captured());
    }

    #[test]
    fn test_wire_defaults() {
        let trx: Transaction =
            serde_json::from_str(r#"{"id":"t1","order_id":"d-1","amount":0}"#).unwrap();
        assert_eq!(trx.status, TransactionStatus::Pending);
        assert!(trx.linked_trx_ids.is_empty());
        assert!(!trx.accept_less);
    }
}
