//! Version Ledger - 版本号台账
//!
//! POS order id → (version, checkin id), transaction id → version.
//! Entries are created at acceptance and removed only when the order leaves
//! the active store.

use super::storage::{OrderStorage, StorageResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Ledger entry of one active order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub checkin_id: Option<String>,
}

/// Version ledger (write-through to redb)
#[derive(Debug)]
pub struct VersionLedger {
    orders: DashMap<String, LedgerEntry>,
    transactions: DashMap<String, String>,
    storage: OrderStorage,
}

impl VersionLedger {
    /// Load the ledger from storage
    pub fn restore(storage: OrderStorage) -> StorageResult<Self> {
        let orders = DashMap::new();
        for (pos_id, entry) in storage.load_order_versions()? {
            orders.insert(pos_id, entry);
        }
        let transactions = DashMap::new();
        for (trx_id, version) in storage.load_transaction_versions()? {
            transactions.insert(trx_id, version);
        }
        Ok(Self {
            orders,
            transactions,
            storage,
        })
    }

    /// Replace the whole entry of an order
    pub fn record(&self, pos_id: &str, entry: LedgerEntry) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.store_order_version(&txn, pos_id, &entry)?;
        txn.commit()?;
        self.orders.insert(pos_id.to_string(), entry);
        Ok(())
    }

    /// Cache an entry already committed by the caller
    pub(crate) fn cache(&self, pos_id: &str, entry: LedgerEntry) {
        self.orders.insert(pos_id.to_string(), entry);
    }

    /// Update the version, keeping the checkin
    pub fn record_version(&self, pos_id: &str, version: impl Into<String>) -> StorageResult<()> {
        let mut entry = self.get(pos_id).unwrap_or_default();
        entry.version = Some(version.into());
        self.record(pos_id, entry)
    }

    /// Update the checkin, keeping the version
    pub fn record_checkin(
        &self,
        pos_id: &str,
        checkin_id: impl Into<String>,
    ) -> StorageResult<()> {
        let mut entry = self.get(pos_id).unwrap_or_default();
        entry.checkin_id = Some(checkin_id.into());
        self.record(pos_id, entry)
    }

    pub fn get(&self, pos_id: &str) -> Option<LedgerEntry> {
        self.orders.get(pos_id).map(|e| e.value().clone())
    }

    pub fn remove(&self, pos_id: &str) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.remove_order_version(&txn, pos_id)?;
        txn.commit()?;
        self.orders.remove(pos_id);
        Ok(())
    }

    pub fn record_transaction(
        &self,
        trx_id: &str,
        version: impl Into<String>,
    ) -> StorageResult<()> {
        let version = version.into();
        let txn = self.storage.begin_write()?;
        self.storage.store_transaction_version(&txn, trx_id, &version)?;
        txn.commit()?;
        self.transactions.insert(trx_id.to_string(), version);
        Ok(())
    }

    pub fn get_transaction(&self, trx_id: &str) -> Option<String> {
        self.transactions.get(trx_id).map(|v| v.value().clone())
    }
}
