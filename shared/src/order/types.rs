//! Line items, surcounts and consumer details

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Surcounts
// ============================================================================

/// How a surcount value is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurcountKind {
    /// `value` is an amount in cents
    #[default]
    Absolute,
    /// `value` is a percent of the amount it applies to
    Percentage,
}

/// Signed adjustment: surcharge when positive, discount when negative
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Surcount {
    pub name: String,
    #[serde(default)]
    pub kind: SurcountKind,
    /// Cents for [`SurcountKind::Absolute`], percent for [`SurcountKind::Percentage`]
    pub value: Decimal,
}

impl Surcount {
    pub fn absolute(name: impl Into<String>, cents: i64) -> Self {
        Self {
            name: name.into(),
            kind: SurcountKind::Absolute,
            value: Decimal::from(cents),
        }
    }

    pub fn percentage(name: impl Into<String>, percent: Decimal) -> Self {
        Self {
            name: name.into(),
            kind: SurcountKind::Percentage,
            value: percent,
        }
    }
}

// ============================================================================
// Order Items
// ============================================================================

/// Order line item
///
/// `pos_id` is the POS product reference. Items arriving from Doshii carry
/// only the partner reference; the SDK fills `pos_id` from the catalog or
/// with the placeholder product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    /// POS product reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_id: Option<String>,
    /// Partner (ordering app) item reference
    #[serde(default)]
    pub partner_ref: String,
    pub name: String,
    pub quantity: i64,
    /// Unit price in cents
    pub unit_price: i64,
    /// Item-level surcounts
    #[serde(default)]
    pub surcounts: Vec<Surcount>,
    /// quantity × unit_price (computed)
    #[serde(default)]
    pub total_before_surcounts: i64,
    /// Line total after item surcounts (computed)
    #[serde(default)]
    pub total_after_surcounts: i64,
}

impl OrderItem {
    pub fn new(
        partner_ref: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        unit_price: i64,
    ) -> Self {
        Self {
            pos_id: None,
            partner_ref: partner_ref.into(),
            name: name.into(),
            quantity,
            unit_price,
            surcounts: Vec::new(),
            total_before_surcounts: 0,
            total_after_surcounts: 0,
        }
    }
}

// ============================================================================
// Consumer
// ============================================================================

/// Postal address of a consumer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Consumer attached to an inbound order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Consumer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_defaults_from_wire() {
        let json = r#"{"partner_ref":"burger","name":"Burger","quantity":2,"unit_price":500}"#;
        let item: OrderItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.pos_id, None);
        assert!(item.surcounts.is_empty());
        assert_eq!(item.total_after_surcounts, 0);
    }

    #[test]
    fn test_surcount_wire_format() {
        let json = r#"{"name":"Happy hour","kind":"percentage","value":"-10"}"#;
        let s: Surcount = serde_json::from_str(json).unwrap();
        assert_eq!(s.kind, SurcountKind::Percentage);
        assert_eq!(s.value, Decimal::from(-10));

        // kind defaults to absolute, value accepts plain numbers
        let s: Surcount = serde_json::from_str(r#"{"name":"Delivery","value":250}"#).unwrap();
        assert_eq!(s, Surcount::absolute("Delivery", 250));
    }

    #[test]
    fn test_consumer_is_optional_everywhere() {
        let consumer: Consumer = serde_json::from_str("{}").unwrap();
        assert_eq!(consumer, Consumer::default());
    }
}
