//! Error categories
//!
//! The category decides how a failed inbound event is answered: order and
//! payment failures are final and are reported back to Doshii as a
//! rejection, system failures are left for the cloud to redeliver.

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx
    General,
    /// 4xxx
    Order,
    /// 5xxx
    Payment,
    /// 9xxx: storage and reporting
    System,
}

impl ErrorCategory {
    /// Category of a raw code value
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0..=3 => Self::General,
            4 => Self::Order,
            5 => Self::Payment,
            _ => Self::System,
        }
    }

    /// Whether failures of this category are answered with a rejection
    pub fn is_decline(&self) -> bool {
        !matches!(self, Self::System)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::General => "general",
            Self::Order => "order",
            Self::Payment => "payment",
            Self::System => "system",
        })
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
