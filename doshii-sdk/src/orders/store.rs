//! Order Store - 活跃订单存储
//!
//! Authoritative collection of active POS orders, keyed by POS id, with a
//! secondary index from Doshii id to POS id and the outcome table.
//!
//! # Locking
//!
//! Every mutation of an order runs under [`OrderStore::lock`] for that
//! order's key: the POS id once assigned, `doshii:<id>` while an inbound
//! order is being decided. When both are needed the Doshii key is taken
//! first. Readers never take these locks; they clone under the shard lock
//! and always see a whole order.

use super::ledger::{LedgerEntry, VersionLedger};
use super::storage::{OrderStorage, StorageResult};
use dashmap::DashMap;
use shared::order::{Order, OrderOutcome};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// First POS order id handed out is `ORDER_ID_BASE + 1`
const ORDER_ID_BASE: u64 = 1000;

/// Guard serializing mutations of one order
pub type OrderGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct OrderStore {
    orders: DashMap<String, Order>,
    /// doshii_id → pos_id
    doshii_index: DashMap<String, String>,
    /// doshii_id → outcome
    outcomes: DashMap<String, OrderOutcome>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    storage: OrderStorage,
}

impl OrderStore {
    /// Load active orders and outcomes from storage
    pub fn restore(storage: OrderStorage) -> StorageResult<Self> {
        let store = Self {
            orders: DashMap::new(),
            doshii_index: DashMap::new(),
            outcomes: DashMap::new(),
            locks: DashMap::new(),
            storage,
        };
        for order in store.storage.load_orders()? {
            store.cache(order);
        }
        for outcome in store.storage.load_outcomes()? {
            store.outcomes.insert(outcome.doshii_id.clone(), outcome);
        }
        tracing::info!(
            active_orders = store.orders.len(),
            outcomes = store.outcomes.len(),
            "Order store restored"
        );
        Ok(store)
    }

    /// Lock key used while an inbound order has no POS id yet
    pub fn creation_key(doshii_id: &str) -> String {
        format!("doshii:{doshii_id}")
    }

    /// Acquire the per-order mutex for `key`
    pub async fn lock(&self, key: &str) -> OrderGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drop mutexes nobody holds or waits on
    fn prune_locks(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    /// Allocate the next POS order id (persisted counter)
    pub fn next_pos_id(&self) -> StorageResult<String> {
        let count = self.storage.next_order_count()?;
        Ok((ORDER_ID_BASE + count).to_string())
    }

    // ========== Orders ==========

    /// Insert or replace an active order
    pub fn insert(&self, order: Order) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.store_order(&txn, &order)?;
        txn.commit()?;
        self.cache(order);
        Ok(())
    }

    /// Persist a newly accepted order, its ledger entry and its outcome in
    /// a single commit
    pub fn admit(
        &self,
        order: Order,
        entry: LedgerEntry,
        outcome: OrderOutcome,
        ledger: &VersionLedger,
    ) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.store_order(&txn, &order)?;
        if let Some(pos_id) = order.id.as_deref() {
            self.storage.store_order_version(&txn, pos_id, &entry)?;
        }
        self.storage.store_outcome(&txn, &outcome)?;
        txn.commit()?;

        if let Some(pos_id) = order.id.as_deref() {
            ledger.cache(pos_id, entry);
        }
        self.outcomes.insert(outcome.doshii_id.clone(), outcome);
        self.cache(order);
        Ok(())
    }

    /// Same as [`insert`](Self::insert); reads better at update sites
    pub fn replace(&self, order: Order) -> StorageResult<()> {
        self.insert(order)
    }

    fn cache(&self, order: Order) {
        let Some(pos_id) = order.id.clone() else {
            return;
        };
        if let Some(doshii_id) = order.doshii_id.clone() {
            self.doshii_index.insert(doshii_id, pos_id.clone());
        }
        self.orders.insert(pos_id, order);
    }

    /// Consistent clone of an active order
    pub fn get(&self, pos_id: &str) -> Option<Order> {
        self.orders.get(pos_id).map(|o| o.value().clone())
    }

    pub fn contains(&self, pos_id: &str) -> bool {
        self.orders.contains_key(pos_id)
    }

    /// Remove an order from the active set; its outcome is kept
    pub fn remove(&self, pos_id: &str) -> StorageResult<Option<Order>> {
        let txn = self.storage.begin_write()?;
        self.storage.remove_order(&txn, pos_id)?;
        txn.commit()?;

        let removed = self.orders.remove(pos_id).map(|(_, order)| order);
        if let Some(doshii_id) = removed.as_ref().and_then(|o| o.doshii_id.as_deref()) {
            self.doshii_index.remove(doshii_id);
        }
        self.prune_locks();
        Ok(removed)
    }

    /// POS id of an active order by Doshii id
    pub fn pos_id_for(&self, doshii_id: &str) -> Option<String> {
        self.doshii_index.get(doshii_id).map(|v| v.value().clone())
    }

    /// Snapshot of all active orders, sorted by POS id
    pub fn active_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|e| e.value().clone()).collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        orders
    }

    // ========== Outcomes ==========

    pub fn outcome_for(&self, doshii_id: &str) -> Option<OrderOutcome> {
        self.outcomes.get(doshii_id).map(|o| o.value().clone())
    }

    pub fn record_outcome(&self, outcome: OrderOutcome) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.store_outcome(&txn, &outcome)?;
        txn.commit()?;
        self.outcomes.insert(outcome.doshii_id.clone(), outcome);
        Ok(())
    }

    /// Flag a decision as acknowledged by Doshii
    pub fn mark_reported(&self, doshii_id: &str) -> StorageResult<Option<OrderOutcome>> {
        let Some(mut outcome) = self.outcome_for(doshii_id) else {
            return Ok(None);
        };
        if !outcome.reported {
            outcome.reported = true;
            self.record_outcome(outcome.clone())?;
        }
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{OrderItem, OrderStatus};
    use std::time::Duration;

    fn store() -> OrderStore {
        OrderStore::restore(OrderStorage::open_in_memory().unwrap()).unwrap()
    }

    fn accepted(pos_id: &str, doshii_id: &str) -> Order {
        let mut order = Order::pending(doshii_id, vec![OrderItem::new("tea", "Tea", 1, 300)]);
        order.id = Some(pos_id.to_string());
        order.status = OrderStatus::Accepted;
        order
    }

    #[test]
    fn test_pos_ids_are_monotonic() {
        let store = store();
        assert_eq!(store.next_pos_id().unwrap(), "1001");
        assert_eq!(store.next_pos_id().unwrap(), "1002");
    }

    #[test]
    fn test_insert_get_remove() {
        let store = store();
        store.insert(accepted("1001", "d-1")).unwrap();

        assert!(store.contains("1001"));
        assert_eq!(store.pos_id_for("d-1").as_deref(), Some("1001"));
        assert_eq!(store.get("1001").unwrap().doshii_id.as_deref(), Some("d-1"));

        let removed = store.remove("1001").unwrap();
        assert!(removed.is_some());
        assert!(store.get("1001").is_none());
        assert!(store.pos_id_for("d-1").is_none());
        assert!(store.remove("1001").unwrap().is_none());
    }

    #[test]
    fn test_outcome_survives_removal() {
        let store = store();
        store.insert(accepted("1001", "d-1")).unwrap();
        store
            .record_outcome(OrderOutcome::accepted("d-1", "1001"))
            .unwrap();
        store.remove("1001").unwrap();

        let outcome = store.mark_reported("d-1").unwrap().unwrap();
        assert!(outcome.reported);
        assert!(store.outcome_for("d-1").unwrap().reported);
        assert!(store.mark_reported("d-unknown").unwrap().is_none());
    }

    #[test]
    fn test_restore_rebuilds_index() {
        let storage = OrderStorage::open_in_memory().unwrap();
        {
            let store = OrderStore::restore(storage.clone()).unwrap();
            store.insert(accepted("1001", "d-1")).unwrap();
            store
                .record_outcome(OrderOutcome::accepted("d-1", "1001"))
                .unwrap();
        }

        let store = OrderStore::restore(storage).unwrap();
        assert_eq!(store.pos_id_for("d-1").as_deref(), Some("1001"));
        assert!(store.outcome_for("d-1").is_some());
        assert_eq!(store.active_orders().len(), 1);
    }

    #[test]
    fn test_admit_commits_order_ledger_and_outcome_together() {
        let storage = OrderStorage::open_in_memory().unwrap();
        {
            let store = OrderStore::restore(storage.clone()).unwrap();
            let ledger = VersionLedger::restore(storage.clone()).unwrap();
            let entry = LedgerEntry {
                version: Some("c1".into()),
                checkin_id: None,
            };
            store
                .admit(
                    accepted("1001", "d-1"),
                    entry,
                    OrderOutcome::accepted("d-1", "1001"),
                    &ledger,
                )
                .unwrap();
            assert_eq!(ledger.get("1001").unwrap().version.as_deref(), Some("c1"));
        }

        let store = OrderStore::restore(storage.clone()).unwrap();
        let ledger = VersionLedger::restore(storage).unwrap();
        assert!(store.contains("1001"));
        assert_eq!(
            store.outcome_for("d-1").unwrap().pos_id.as_deref(),
            Some("1001")
        );
        assert_eq!(ledger.get("1001").unwrap().version.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_lock_serializes_same_key() {
        let store = Arc::new(store());
        let guard = store.lock("1001").await;

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let _g = store.lock("1001").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // A different order is not blocked
        let other = tokio::time::timeout(Duration::from_millis(100), store.lock("1002")).await;
        assert!(other.is_ok());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }
}
