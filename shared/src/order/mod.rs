//! Order domain types
//!
//! - Orders and their line items, as exchanged with Doshii
//! - Transactions (captures and refunds)
//! - Outcomes: accept/reject decisions remembered per Doshii order id

pub mod outcome;
pub mod snapshot;
pub mod transaction;
pub mod types;

// Re-exports
pub use outcome::{OrderOutcome, Rejection};
pub use snapshot::{Order, OrderEdit, OrderStatus};
pub use transaction::{Transaction, TransactionStatus};
pub use types::*;
