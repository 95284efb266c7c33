//! Transaction Store
//!
//! All known transactions by id. Completed captures and refunds are kept
//! after their order leaves the active store; refunds are validated against
//! them.

use crate::orders::storage::{OrderStorage, StorageResult};
use dashmap::DashMap;
use shared::order::{Transaction, TransactionStatus};

#[derive(Debug)]
pub struct TransactionStore {
    transactions: DashMap<String, Transaction>,
    storage: OrderStorage,
}

impl TransactionStore {
    pub fn restore(storage: OrderStorage) -> StorageResult<Self> {
        let transactions = DashMap::new();
        for trx in storage.load_transactions()? {
            transactions.insert(trx.id.clone(), trx);
        }
        Ok(Self {
            transactions,
            storage,
        })
    }

    /// Insert or replace
    pub fn insert(&self, trx: Transaction) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.store_transaction(&txn, &trx)?;
        txn.commit()?;
        self.transactions.insert(trx.id.clone(), trx);
        Ok(())
    }

    pub fn get(&self, trx_id: &str) -> Option<Transaction> {
        self.transactions.get(trx_id).map(|t| t.value().clone())
    }

    pub fn contains(&self, trx_id: &str) -> bool {
        self.transactions.contains_key(trx_id)
    }

    /// All transactions of a POS order
    pub fn for_order(&self, pos_id: &str) -> Vec<Transaction> {
        let mut list: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.order_id == pos_id)
            .map(|t| t.value().clone())
            .collect();
        list.sort_by_key(|t| t.created_at);
        list
    }

    /// Completed captures minus completed refunds
    pub fn net_captured(&self, pos_id: &str) -> i64 {
        self.transactions
            .iter()
            .filter(|t| t.order_id == pos_id)
            .filter(|t| t.is_captured() || t.is_refunded())
            .map(|t| t.amount)
            .sum()
    }

    /// Number of completed captures
    pub fn capture_count(&self, pos_id: &str) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.order_id == pos_id && t.is_captured())
            .count()
    }

    /// Magnitude of refunds drawn against any of `capture_ids`, completed
    /// or still waiting, other than `except`
    pub fn reserved_against(&self, capture_ids: &[String], except: &str) -> i64 {
        self.transactions
            .iter()
            .filter(|t| t.is_refund() && t.id != except)
            .filter(|t| {
                matches!(
                    t.status,
                    TransactionStatus::Waiting | TransactionStatus::Complete
                )
            })
            .filter(|t| t.linked_trx_ids.iter().any(|id| capture_ids.contains(id)))
            .map(|t| -t.amount)
            .sum()
    }
}
