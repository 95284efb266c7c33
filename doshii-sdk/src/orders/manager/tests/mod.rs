use super::*;
use crate::cloud::{RecordingReporter, ReportCall};
use crate::orders::storage::OrderStorage;
use crate::pos::AutoAcceptPolicy;
use shared::order::{OrderItem, TransactionStatus};
use std::collections::HashMap;

struct Harness {
    manager: OrdersManager,
    reporter: Arc<RecordingReporter>,
    transactions: Arc<TransactionStore>,
}

fn catalog() -> HashMap<String, String> {
    HashMap::from([
        ("latte".to_string(), "SKU-LATTE".to_string()),
        ("muffin".to_string(), "SKU-MUFFIN".to_string()),
    ])
}

fn create_harness_with(policy: impl OrderingPolicy + 'static) -> Harness {
    create_harness_on(OrderStorage::open_in_memory().unwrap(), policy)
}

/// Harness over existing storage, restoring whatever it already holds
fn create_harness_on(storage: OrderStorage, policy: impl OrderingPolicy + 'static) -> Harness {
    let reporter = Arc::new(RecordingReporter::new());
    let transactions = Arc::new(TransactionStore::restore(storage.clone()).unwrap());
    let manager = OrdersManager::new(
        Arc::new(OrderStore::restore(storage.clone()).unwrap()),
        Arc::new(VersionLedger::restore(storage).unwrap()),
        transactions.clone(),
        reporter.clone(),
        Arc::new(policy),
        Arc::new(catalog()),
    );
    Harness {
        manager,
        reporter,
        transactions,
    }
}

fn create_harness() -> Harness {
    create_harness_with(AutoAcceptPolicy::default())
}

/// 2 x Latte @ 4.50 + 1 x Muffin @ 11.00 = 20.00
fn cloud_order(doshii_id: &str) -> Order {
    let mut order = Order::pending(
        doshii_id,
        vec![
            OrderItem::new("latte", "Latte", 2, 450),
            OrderItem::new("muffin", "Muffin", 1, 1100),
        ],
    );
    order.version = Some("c1".to_string());
    order
}

/// Accept `doshii_id` and return its POS id
async fn accept(h: &Harness, doshii_id: &str) -> String {
    let outcome = h
        .manager
        .evaluate_new_order(cloud_order(doshii_id), &Consumer::default(), &[])
        .await
        .unwrap();
    assert_eq!(outcome.status, OrderStatus::Accepted);
    outcome.pos_id.unwrap()
}

/// Record a completed capture directly in the transaction store
fn captured(h: &Harness, trx_id: &str, pos_id: &str, amount: i64) {
    let mut trx = Transaction::capture(trx_id, pos_id, amount);
    trx.status = TransactionStatus::Complete;
    h.transactions.insert(trx).unwrap();
}

/// Rejects orders above a fixed total
struct MaxTotalPolicy(i64);

impl OrderingPolicy for MaxTotalPolicy {
    fn evaluate(&self, order: &Order, _consumer: &Consumer) -> PolicyDecision {
        if order.total > self.0 {
            PolicyDecision::Reject(format!("orders above {} are not taken online", self.0))
        } else {
            PolicyDecision::Accept
        }
    }

    fn allow_partial_payment(&self, _order: &Order) -> bool {
        false
    }
}
