//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are integer cents on the wire. Percentage surcounts are computed
//! in `Decimal` and rounded half away from zero to whole cents; every
//! surcount of a list applies to the same base (no compounding).

use super::manager::{ManagerError, ManagerResult};
use rust_decimal::prelude::*;
use shared::order::{Order, OrderItem, Surcount, SurcountKind};

/// Maximum allowed unit price (1,000,000.00)
const MAX_UNIT_PRICE: i64 = 100_000_000;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i64 = 9999;

/// Round to whole cents, half away from zero
#[inline]
fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[inline]
fn to_cents(value: Decimal) -> ManagerResult<i64> {
    value
        .to_i64()
        .ok_or_else(|| ManagerError::InvalidOrder(format!("amount out of range: {value}")))
}

/// Validate a line item before pricing it
pub fn validate_item(item: &OrderItem) -> ManagerResult<()> {
    if item.quantity <= 0 || item.quantity > MAX_QUANTITY {
        return Err(ManagerError::InvalidOrder(format!(
            "item '{}': quantity must be between 1 and {}, got {}",
            item.name, MAX_QUANTITY, item.quantity
        )));
    }
    if item.unit_price < 0 || item.unit_price > MAX_UNIT_PRICE {
        return Err(ManagerError::InvalidOrder(format!(
            "item '{}': unit price must be between 0 and {}, got {}",
            item.name, MAX_UNIT_PRICE, item.unit_price
        )));
    }
    Ok(())
}

/// Signed adjustment of all surcounts against `base`
fn surcount_delta(base: Decimal, surcounts: &[Surcount]) -> Decimal {
    surcounts
        .iter()
        .map(|s| match s.kind {
            SurcountKind::Absolute => s.value,
            SurcountKind::Percentage => base * s.value / Decimal::ONE_HUNDRED,
        })
        .sum()
}

/// Apply surcounts to `base`, clamped at zero
pub fn apply_surcounts(base: Decimal, surcounts: &[Surcount]) -> Decimal {
    round_cents(base + surcount_delta(base, surcounts)).max(Decimal::ZERO)
}

/// Recompute item totals and the order total in place
pub fn recalculate(order: &mut Order) -> ManagerResult<()> {
    let mut subtotal = Decimal::ZERO;
    for item in &mut order.items {
        validate_item(item)?;
        let before = Decimal::from(item.quantity) * Decimal::from(item.unit_price);
        let after = apply_surcounts(before, &item.surcounts);
        item.total_before_surcounts = to_cents(before)?;
        item.total_after_surcounts = to_cents(after)?;
        subtotal += after;
    }
    order.total = to_cents(apply_surcounts(subtotal, &order.surcounts))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(items: Vec<OrderItem>, surcounts: Vec<Surcount>) -> Order {
        let mut order = Order::pending("d-1", items);
        order.surcounts = surcounts;
        order
    }

    #[test]
    fn test_plain_items() {
        let mut o = order(
            vec![
                OrderItem::new("a", "A", 2, 500),
                OrderItem::new("b", "B", 1, 1000),
            ],
            vec![],
        );
        recalculate(&mut o).unwrap();
        assert_eq!(o.items[0].total_before_surcounts, 1000);
        assert_eq!(o.items[0].total_after_surcounts, 1000);
        assert_eq!(o.total, 2000);
    }

    #[test]
    fn test_order_surcharge_and_discount() {
        let mut o = order(
            vec![OrderItem::new("a", "A", 1, 2000)],
            vec![
                Surcount::percentage("Sunday", Decimal::from(10)),
                Surcount::absolute("Voucher", -500),
            ],
        );
        recalculate(&mut o).unwrap();
        // 2000 + 200 - 500, percentages do not compound with absolutes
        assert_eq!(o.total, 1700);
    }

    #[test]
    fn test_item_level_percentage_rounds_half_away_from_zero() {
        let mut item = OrderItem::new("a", "A", 1, 5);
        item.surcounts = vec![Surcount::percentage("Fee", Decimal::from(10))];
        let mut o = order(vec![item], vec![]);
        recalculate(&mut o).unwrap();
        // 5 + 0.5 → 6
        assert_eq!(o.items[0].total_after_surcounts, 6);

        let mut item = OrderItem::new("a", "A", 1, 333);
        item.surcounts = vec![Surcount::percentage("Promo", Decimal::from(-15))];
        let mut o = order(vec![item], vec![]);
        recalculate(&mut o).unwrap();
        // 333 - 49.95 = 283.05 → 283
        assert_eq!(o.total, 283);
    }

    #[test]
    fn test_discount_never_goes_negative() {
        let mut o = order(
            vec![OrderItem::new("a", "A", 1, 200)],
            vec![Surcount::absolute("Comp", -250)],
        );
        recalculate(&mut o).unwrap();
        assert_eq!(o.total, 0);
    }

    #[test]
    fn test_invalid_items_rejected() {
        let mut o = order(vec![OrderItem::new("a", "A", 0, 200)], vec![]);
        assert!(matches!(recalculate(&mut o), Err(ManagerError::InvalidOrder(_))));

        let mut o = order(vec![OrderItem::new("a", "A", 1, -1)], vec![]);
        assert!(matches!(recalculate(&mut o), Err(ManagerError::InvalidOrder(_))));
    }
}
