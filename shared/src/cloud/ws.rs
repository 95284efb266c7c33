//! Socket feed messages pushed by Doshii to the POS

use serde::{Deserialize, Serialize};

use crate::order::{Consumer, Order, Transaction};

/// Event delivered over the Doshii socket
///
/// At-least-once delivery; no ordering guarantee across orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudEvent {
    /// New order awaiting an accept/reject decision
    OrderCreated {
        order: Order,
        #[serde(default)]
        consumer: Consumer,
        /// Prepayment bundled with the order
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transactions: Vec<Transaction>,
    },

    /// Partner-side change to an accepted order
    OrderUpdated { order: Order },

    /// Order cancelled from a venue-operated device
    OrderVenueCancelled { order: Order },

    /// Ready-to-pay (amount ≥ 0) or ready-to-refund (amount < 0)
    TransactionCreated { transaction: Transaction },

    /// Partner aborted before capture
    TransactionCancelled { transaction: Transaction },

    /// Funds captured or refunded
    TransactionCompleted { transaction: Transaction },
}

impl CloudEvent {
    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            CloudEvent::OrderCreated { .. } => "order_created",
            CloudEvent::OrderUpdated { .. } => "order_updated",
            CloudEvent::OrderVenueCancelled { .. } => "order_venue_cancelled",
            CloudEvent::TransactionCreated { .. } => "transaction_created",
            CloudEvent::TransactionCancelled { .. } => "transaction_cancelled",
            CloudEvent::TransactionCompleted { .. } => "transaction_completed",
        }
    }
}
