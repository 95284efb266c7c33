//! Shared types for the Doshii POS integration
//!
//! Wire and domain types used by both the SDK and the host POS:
//! orders, transactions, consumers, socket messages, unified error codes
//! and time helpers.

pub mod cloud;
pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use cloud::{CloudEvent, ReportReceipt};
pub use error::{AppError, AppResult, ErrorCode};
pub use order::{
    Consumer, Order, OrderEdit, OrderItem, OrderOutcome, OrderStatus, Rejection, Surcount,
    SurcountKind, Transaction, TransactionStatus,
};
