//! POS integration points
//!
//! The host POS customizes the SDK through these traits, injected into
//! [`SdkState`](crate::core::SdkState):
//!
//! - [`OrderingPolicy`]: accept or reject an inbound order, partial payments
//! - [`CatalogLookup`]: partner item reference → POS product reference

use shared::order::{Consumer, Order};
use std::collections::HashMap;

/// Result of the POS business policy on an inbound order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Accept,
    Reject(String),
}

/// Venue business rules
pub trait OrderingPolicy: Send + Sync {
    /// Decide on an inbound order (items already mapped and priced)
    fn evaluate(&self, order: &Order, consumer: &Consumer) -> PolicyDecision;

    /// Whether the order may be settled by less than its total
    fn allow_partial_payment(&self, order: &Order) -> bool;
}

/// Product catalog of the POS
pub trait CatalogLookup: Send + Sync {
    /// POS product reference for a partner item reference, `None` if unknown
    fn resolve(&self, partner_ref: &str) -> Option<String>;
}

/// Accepts every order
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAcceptPolicy {
    pub allow_partial_payment: bool,
}

impl OrderingPolicy for AutoAcceptPolicy {
    fn evaluate(&self, _order: &Order, _consumer: &Consumer) -> PolicyDecision {
        PolicyDecision::Accept
    }

    fn allow_partial_payment(&self, _order: &Order) -> bool {
        self.allow_partial_payment
    }
}

/// Static partner_ref → product map
impl CatalogLookup for HashMap<String, String> {
    fn resolve(&self, partner_ref: &str) -> Option<String> {
        self.get(partner_ref).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_accept() {
        let policy = AutoAcceptPolicy::default();
        let order = Order::pending("d-1", vec![]);
        assert_eq!(
            policy.evaluate(&order, &Consumer::default()),
            PolicyDecision::Accept
        );
        assert!(!policy.allow_partial_payment(&order));
    }

    #[test]
    fn test_map_catalog() {
        let catalog: HashMap<String, String> =
            HashMap::from([("latte".to_string(), "SKU-17".to_string())]);
        assert_eq!(catalog.resolve("latte").as_deref(), Some("SKU-17"));
        assert_eq!(catalog.resolve("mystery"), None);
    }
}
