//! Doshii order reconciliation
//!
//! - **manager**: OrdersManager, the Order Acceptance Workflow
//! - **store**: active orders, Doshii id index, outcomes, per-order locks
//! - **ledger**: Version Ledger (order version + checkin, transaction versions)
//! - **money**: Decimal pricing of items, surcounts and totals
//! - **storage**: redb persistence shared by store, ledger and transactions
//!
//! # Architecture
//!
//! ```text
//! CloudEvent → EventRouter → OrdersManager → OrderStore / VersionLedger (redb)
//!                                  ↓
//!                             CloudReporter → Doshii
//! ```

pub mod ledger;
pub mod manager;
pub mod money;
pub mod storage;
pub mod store;

// Re-exports
pub use ledger::{LedgerEntry, VersionLedger};
pub use manager::{ManagerError, ManagerResult, OrdersManager};
pub use storage::{OrderStorage, StorageError, StorageResult};
pub use store::{OrderGuard, OrderStore};

// Re-export shared types for convenience
pub use shared::order::{
    Consumer, Order, OrderEdit, OrderItem, OrderOutcome, OrderStatus, Rejection, Surcount,
    SurcountKind,
};
