//! Order snapshot as held by the POS and exchanged with Doshii

use super::types::{OrderItem, Surcount};
use serde::{Deserialize, Serialize};

/// Order status
///
/// ```text
/// Pending ──► Accepted ──► Complete
///    │            │
///    ▼            ▼
/// Rejected   VenueCancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Complete,
    VenueCancelled,
}

impl OrderStatus {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Complete | OrderStatus::VenueCancelled
        )
    }

    /// Whether the state machine allows `self → next`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Accepted)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Accepted, OrderStatus::Complete)
                | (OrderStatus::Accepted, OrderStatus::VenueCancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Complete => "complete",
            OrderStatus::VenueCancelled => "venue_cancelled",
        };
        f.write_str(s)
    }
}

/// Order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    /// POS order id (assigned on acceptance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Doshii order id (absent for walk-in orders until reported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doshii_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    /// Free-text POS lifecycle label
    #[serde(default)]
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkin_id: Option<String>,
    /// Opaque version token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Order-level surcounts
    #[serde(default)]
    pub surcounts: Vec<Surcount>,
    /// Computed order total in cents
    #[serde(default)]
    pub total: i64,
    /// Transaction currently holding the order locked for capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_lock: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Order {
    /// New pending order as it arrives from Doshii
    pub fn pending(doshii_id: impl Into<String>, items: Vec<OrderItem>) -> Self {
        Self {
            id: None,
            doshii_id: Some(doshii_id.into()),
            status: OrderStatus::Pending,
            phase: String::new(),
            checkin_id: None,
            version: None,
            items,
            surcounts: Vec::new(),
            total: 0,
            payment_lock: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Whether a capture is currently in flight
    pub fn is_locked(&self) -> bool {
        self.payment_lock.is_some()
    }

    /// Id used in log lines: POS id when assigned, else Doshii id
    pub fn display_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.doshii_id.as_deref())
            .unwrap_or("<unassigned>")
    }
}

/// POS-side edit of an active order
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OrderEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcounts: Option<Vec<Surcount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl OrderEdit {
    pub fn is_empty(&self) -> bool {
        self.items.is_none() && self.surcounts.is_none() && self.phase.is_none()
    }

    /// Whether applying this edit can change the amount owing
    pub fn touches_amount(&self) -> bool {
        self.items.is_some() || self.surcounts.is_some()
    }
}
