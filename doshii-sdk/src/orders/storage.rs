//! redb-based persistence for the reconciliation state
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `pos_id` | `Order` | Active orders |
//! | `outcomes` | `doshii_id` | `OrderOutcome` | Accept/reject decisions (idempotence) |
//! | `transactions` | `transaction_id` | `Transaction` | Captures and refunds |
//! | `order_versions` | `pos_id` | `LedgerEntry` | Version + checkin per active order |
//! | `transaction_versions` | `transaction_id` | version | Version per transaction |
//! | `counters` | name | `u64` | POS order id counter |
//!
//! Values are JSON-serialized. Every store writes through on mutation and is
//! restored from these tables at startup.

use super::ledger::LedgerEntry;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::order::{Order, OrderOutcome, Transaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Active orders: key = pos_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Decisions: key = doshii_id, value = JSON-serialized OrderOutcome
const OUTCOMES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("outcomes");

/// Transactions: key = transaction id, value = JSON-serialized Transaction
const TRANSACTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Order versions: key = pos_id, value = JSON-serialized LedgerEntry
const ORDER_VERSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("order_versions");

/// Transaction versions: key = transaction id, value = version token
const TRANSACTION_VERSIONS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("transaction_versions");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ORDER_COUNT_KEY: &str = "order_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Reconciliation storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable once `commit()` returns, so a decision that
    /// was persisted survives a crash before it is reported to Doshii.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and ephemeral runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(OUTCOMES_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(ORDER_VERSIONS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTION_VERSIONS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ORDER_COUNT_KEY)?.is_none() {
                counters.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Counter ==========

    /// Get and increment order count atomically
    /// Returns the NEW count after increment
    pub fn next_order_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(ORDER_COUNT_KEY, next)?;
        drop(table);
        txn.commit()?;
        Ok(next)
    }

    /// Get current order count (without incrementing)
    pub fn get_order_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0))
    }

    // ========== Orders ==========

    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        // Only accepted orders carry a POS id
        let Some(pos_id) = order.id.as_deref() else {
            return Ok(());
        };
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(pos_id, value.as_slice())?;
        Ok(())
    }

    pub fn remove_order(&self, txn: &WriteTransaction, pos_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.remove(pos_id)?;
        Ok(())
    }

    pub fn load_orders(&self) -> StorageResult<Vec<Order>> {
        self.load_json(ORDERS_TABLE)
    }

    // ========== Outcomes ==========

    pub fn store_outcome(
        &self,
        txn: &WriteTransaction,
        outcome: &OrderOutcome,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(OUTCOMES_TABLE)?;
        let value = serde_json::to_vec(outcome)?;
        table.insert(outcome.doshii_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn load_outcomes(&self) -> StorageResult<Vec<OrderOutcome>> {
        self.load_json(OUTCOMES_TABLE)
    }

    // ========== Transactions ==========

    pub fn store_transaction(
        &self,
        txn: &WriteTransaction,
        trx: &Transaction,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRANSACTIONS_TABLE)?;
        let value = serde_json::to_vec(trx)?;
        table.insert(trx.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn load_transactions(&self) -> StorageResult<Vec<Transaction>> {
        self.load_json(TRANSACTIONS_TABLE)
    }

    // ========== Versions ==========

    pub fn store_order_version(
        &self,
        txn: &WriteTransaction,
        pos_id: &str,
        entry: &LedgerEntry,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_VERSIONS_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert(pos_id, value.as_slice())?;
        Ok(())
    }

    pub fn remove_order_version(&self, txn: &WriteTransaction, pos_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_VERSIONS_TABLE)?;
        table.remove(pos_id)?;
        Ok(())
    }

    pub fn load_order_versions(&self) -> StorageResult<Vec<(String, LedgerEntry)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_VERSIONS_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let entry: LedgerEntry = serde_json::from_slice(value.value())?;
            entries.push((key.value().to_string(), entry));
        }
        Ok(entries)
    }

    pub fn store_transaction_version(
        &self,
        txn: &WriteTransaction,
        trx_id: &str,
        version: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRANSACTION_VERSIONS_TABLE)?;
        table.insert(trx_id, version)?;
        Ok(())
    }

    pub fn load_transaction_versions(&self) -> StorageResult<Vec<(String, String)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTION_VERSIONS_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            entries.push((key.value().to_string(), value.value().to_string()));
        }
        Ok(entries)
    }

    fn load_json<T: serde::de::DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
    ) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;

        let mut values = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            values.push(serde_json::from_slice(value.value())?);
        }
        Ok(values)
    }
}
