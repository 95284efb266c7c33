//! Demo venue: a fixed menu and a couple of house rules

use doshii_sdk::{CatalogLookup, OrderingPolicy, PolicyDecision};
use shared::order::{Consumer, Order};

/// partner_ref → POS SKU
const MENU: &[(&str, &str)] = &[
    ("flat-white", "SKU-100"),
    ("long-black", "SKU-101"),
    ("croissant", "SKU-200"),
    ("banana-bread", "SKU-201"),
];

/// Static menu of the demo cafe
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCatalog;

impl CatalogLookup for SampleCatalog {
    fn resolve(&self, partner_ref: &str) -> Option<String> {
        MENU.iter()
            .find(|(partner, _)| *partner == partner_ref)
            .map(|(_, sku)| sku.to_string())
    }
}

/// House rules of the demo cafe
#[derive(Debug, Clone)]
pub struct SamplePolicy {
    /// Largest order total accepted, in cents
    pub max_order_total: i64,
    /// Orders at or above this total may be paid in instalments
    pub split_payment_threshold: i64,
}

impl Default for SamplePolicy {
    fn default() -> Self {
        Self {
            max_order_total: 50_000,
            split_payment_threshold: 10_000,
        }
    }
}

impl OrderingPolicy for SamplePolicy {
    fn evaluate(&self, order: &Order, _consumer: &Consumer) -> PolicyDecision {
        if order.items.is_empty() {
            return PolicyDecision::Reject("order has no items".into());
        }
        if order.total > self.max_order_total {
            return PolicyDecision::Reject(format!(
                "order total {} exceeds the venue limit of {}",
                order.total, self.max_order_total
            ));
        }
        PolicyDecision::Accept
    }

    fn allow_partial_payment(&self, order: &Order) -> bool {
        order.total >= self.split_payment_threshold
    }
}
