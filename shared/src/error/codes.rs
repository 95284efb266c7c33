//! Unified error codes for the Doshii integration
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment / transaction errors
//! - 9xxx: System errors (storage, cloud reporting)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that rejection reasons
/// sent to the cloud carry a stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Malformed inbound data
    ValidationFailed = 2,

    // ==================== 4xxx: Order ====================
    /// No active order with the given POS id
    OrderNotFound = 4001,
    /// Order already exists with a conflicting outcome
    DuplicateOrder = 4002,
    /// Order is locked by an in-flight capture
    OrderLocked = 4003,
    /// Order is complete, cancelled or rejected
    OrderTerminal = 4004,
    /// POS business policy declined the order
    OrderRejectedByPolicy = 4005,
    /// Order cannot complete before it is fully paid
    OrderNotPaid = 4006,

    // ==================== 5xxx: Payment ====================
    /// Amount does not reconcile with the amount owing
    PaymentAmountMismatch = 5001,
    /// Refund links are missing or do not cover the amount
    TransactionLinkageInvalid = 5002,
    /// No transaction with the given id
    TransactionNotFound = 5003,
    /// Amount sign does not match capture/refund polarity
    InvalidAmountSign = 5004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Persistent storage failure
    StorageError = 9002,
    /// Cloud reporting call failed
    ReportingFailure = 9101,
    /// Cloud rejected the version token
    VersionConflict = 9102,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::DuplicateOrder => "Order already exists",
            ErrorCode::OrderLocked => "Order is locked for payment",
            ErrorCode::OrderTerminal => "Order is no longer active",
            ErrorCode::OrderRejectedByPolicy => "Order rejected by venue policy",
            ErrorCode::OrderNotPaid => "Order is not fully paid",

            // Payment
            ErrorCode::PaymentAmountMismatch => "Payment amount does not match amount owing",
            ErrorCode::TransactionLinkageInvalid => "Refund linkage is invalid",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::InvalidAmountSign => "Transaction amount has the wrong sign",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::ReportingFailure => "Failed to report to Doshii",
            ErrorCode::VersionConflict => "Version conflict with Doshii",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::DuplicateOrder),
            4003 => Ok(ErrorCode::OrderLocked),
            4004 => Ok(ErrorCode::OrderTerminal),
            4005 => Ok(ErrorCode::OrderRejectedByPolicy),
            4006 => Ok(ErrorCode::OrderNotPaid),

            5001 => Ok(ErrorCode::PaymentAmountMismatch),
            5002 => Ok(ErrorCode::TransactionLinkageInvalid),
            5003 => Ok(ErrorCode::TransactionNotFound),
            5004 => Ok(ErrorCode::InvalidAmountSign),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            9101 => Ok(ErrorCode::ReportingFailure),
            9102 => Ok(ErrorCode::VersionConflict),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::DuplicateOrder.code(), 4002);
        assert_eq!(ErrorCode::OrderLocked.code(), 4003);
        assert_eq!(ErrorCode::OrderNotPaid.code(), 4006);
        assert_eq!(ErrorCode::PaymentAmountMismatch.code(), 5001);
        assert_eq!(ErrorCode::TransactionLinkageInvalid.code(), 5002);
        assert_eq!(ErrorCode::InvalidAmountSign.code(), 5004);
        assert_eq!(ErrorCode::ReportingFailure.code(), 9101);
        assert_eq!(ErrorCode::VersionConflict.code(), 9102);
    }

    #[test]
    fn test_try_from_covers_every_code() {
        let all = [
            ErrorCode::ValidationFailed,
            ErrorCode::OrderNotFound,
            ErrorCode::DuplicateOrder,
            ErrorCode::OrderLocked,
            ErrorCode::OrderTerminal,
            ErrorCode::OrderRejectedByPolicy,
            ErrorCode::OrderNotPaid,
            ErrorCode::PaymentAmountMismatch,
            ErrorCode::TransactionLinkageInvalid,
            ErrorCode::TransactionNotFound,
            ErrorCode::InvalidAmountSign,
            ErrorCode::InternalError,
            ErrorCode::StorageError,
            ErrorCode::ReportingFailure,
            ErrorCode::VersionConflict,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
        assert_eq!(
            InvalidErrorCode(4999).to_string(),
            "invalid error code: 4999"
        );
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::PaymentAmountMismatch).unwrap();
        assert_eq!(json, "5001");

        let code: ErrorCode = serde_json::from_str("4003").unwrap();
        assert_eq!(code, ErrorCode::OrderLocked);

        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }

    #[test]
    fn test_display_is_numeric() {
        assert_eq!(ErrorCode::OrderNotFound.to_string(), "4001");
    }
}
