use super::*;
use crate::cloud::{RecordingReporter, ReportCall};
use crate::orders::{Consumer, OrderEdit, OrderItem, OrderStatus, OrderStorage, OrderStore};
use crate::pos::{AutoAcceptPolicy, OrderingPolicy};
use std::collections::HashMap;

struct Harness {
    orders: Arc<OrdersManager>,
    payments: TransactionsManager,
    reporter: Arc<RecordingReporter>,
}

fn create_harness_with(policy: impl OrderingPolicy + 'static) -> Harness {
    let storage = OrderStorage::open_in_memory().unwrap();
    let reporter = Arc::new(RecordingReporter::new());
    let transactions = Arc::new(TransactionStore::restore(storage.clone()).unwrap());
    let ledger = Arc::new(VersionLedger::restore(storage.clone()).unwrap());
    let orders = Arc::new(OrdersManager::new(
        Arc::new(OrderStore::restore(storage).unwrap()),
        ledger.clone(),
        transactions.clone(),
        reporter.clone(),
        Arc::new(policy),
        Arc::new(HashMap::<String, String>::new()),
    ));
    let payments =
        TransactionsManager::new(orders.clone(), transactions, ledger, reporter.clone());
    Harness {
        orders,
        payments,
        reporter,
    }
}

fn create_harness() -> Harness {
    create_harness_with(AutoAcceptPolicy::default())
}

/// Accept an order totalling 20.00 and return its POS id
async fn accepted_order(h: &Harness, doshii_id: &str) -> String {
    let order = Order::pending(doshii_id, vec![OrderItem::new("bowl", "Poke Bowl", 1, 2000)]);
    h.orders
        .evaluate_new_order(order, &Consumer::default(), &[])
        .await
        .unwrap()
        .pos_id
        .unwrap()
}

fn ready(readiness: PaymentReadiness) -> Transaction {
    match readiness {
        PaymentReadiness::Ready(trx) => trx,
        PaymentReadiness::Declined { code, reason } => {
            panic!("expected ready, declined with {code}: {reason}")
        }
    }
}

fn declined_code(readiness: &PaymentReadiness) -> Option<ErrorCode> {
    readiness.rejection().map(|r| r.code)
}

/// Capture `amount` on `pos_id` through the full handshake
async fn pay(h: &Harness, trx_id: &str, pos_id: &str, amount: i64) -> Option<Order> {
    let trx = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture(trx_id, pos_id, amount))
            .await
            .unwrap(),
    );
    h.payments.record_successful_payment(trx).await.unwrap()
}

mod test_payments;
