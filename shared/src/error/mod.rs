//! 统一错误体系
//!
//! 错误码同时作为拒单/拒付原因上报给 Doshii，因此数值必须稳定。
//!
//! | 范围 | 分类 | 处理方式 |
//! |------|------|----------|
//! | 0xxx | General | 回报拒绝 |
//! | 4xxx | Order | 回报拒绝 |
//! | 5xxx | Payment | 回报拒绝 |
//! | 9xxx | System | 不回报，等待云端重投 |
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::OrderLocked, "order 1001 is locked")
//!     .with_detail("transaction_id", "trx-9");
//! assert!(err.category().is_decline());
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
