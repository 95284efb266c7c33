use super::super::storage::StorageError;
use crate::cloud::ReportError;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

/// Manager errors (orders and transactions workflows)
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Reporting failed: {0}")]
    Report(#[from] ReportError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Duplicate order: {0}")]
    DuplicateOrder(String),

    #[error("Order {order_id} is locked by transaction {transaction_id}")]
    OrderLocked {
        order_id: String,
        transaction_id: String,
    },

    #[error("Order {0} is {1}")]
    OrderTerminal(String, OrderStatus),

    #[error("Order {order_id} is not paid: total {total}, captured {captured}")]
    OrderNotPaid {
        order_id: String,
        total: i64,
        captured: i64,
    },

    #[error("Amount mismatch: owing {owing}, requested {requested}")]
    PaymentAmountMismatch { owing: i64, requested: i64 },

    #[error("Invalid refund linkage: {0}")]
    TransactionLinkageInvalid(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction {transaction_id} has the wrong sign: {amount}")]
    InvalidAmountSign {
        transaction_id: String,
        amount: i64,
    },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) => ErrorCode::InternalError,
        _ => ErrorCode::StorageError,
    }
}

impl ManagerError {
    /// Unified error code of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::Report(ReportError::VersionConflict(_)) => ErrorCode::VersionConflict,
            ManagerError::Report(_) => ErrorCode::ReportingFailure,
            ManagerError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            ManagerError::DuplicateOrder(_) => ErrorCode::DuplicateOrder,
            ManagerError::OrderLocked { .. } => ErrorCode::OrderLocked,
            ManagerError::OrderTerminal(..) => ErrorCode::OrderTerminal,
            ManagerError::OrderNotPaid { .. } => ErrorCode::OrderNotPaid,
            ManagerError::PaymentAmountMismatch { .. } => ErrorCode::PaymentAmountMismatch,
            ManagerError::TransactionLinkageInvalid(_) => ErrorCode::TransactionLinkageInvalid,
            ManagerError::TransactionNotFound(_) => ErrorCode::TransactionNotFound,
            ManagerError::InvalidAmountSign { .. } => ErrorCode::InvalidAmountSign,
            ManagerError::InvalidOrder(_) | ManagerError::InvalidOperation(_) => {
                ErrorCode::ValidationFailed
            }
        }
    }
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        let code = err.code();
        if matches!(err, ManagerError::Storage(_)) {
            tracing::error!(error = %err, error_code = %code, "Storage error occurred");
        }
        let app = AppError::with_message(code, err.to_string());
        match err {
            ManagerError::OrderLocked {
                order_id,
                transaction_id,
            } => app
                .with_detail("order_id", order_id)
                .with_detail("transaction_id", transaction_id),
            ManagerError::OrderNotPaid {
                order_id,
                total,
                captured,
            } => app
                .with_detail("order_id", order_id)
                .with_detail("total", total)
                .with_detail("captured", captured),
            ManagerError::PaymentAmountMismatch { owing, requested } => app
                .with_detail("owing", owing)
                .with_detail("requested", requested),
            _ => app,
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
