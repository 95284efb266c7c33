//! Payment transactions (captures and refunds)
//!
//! - **manager**: TransactionsManager, the Transaction Workflow
//! - **store**: all known transactions, write-through to redb

pub mod manager;
pub mod store;

pub use manager::{PaymentReadiness, TransactionsManager};
pub use store::TransactionStore;

pub use shared::order::{Transaction, TransactionStatus};
