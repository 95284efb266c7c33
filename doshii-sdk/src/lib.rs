//! Doshii SDK - POS 端订单与支付对账
//!
//! # 架构概述
//!
//! 把 POS 接入 Doshii 平台：受理/拒绝云端订单，分配 POS 订单号，
//! 记录版本号，并按 POS 计算的应付金额控制收款与退款。
//!
//! # 模块结构
//!
//! ```text
//! doshii-sdk/src/
//! ├── core/          # 配置、状态、事件路由
//! ├── orders/        # 订单受理工作流、订单存储、版本台账
//! ├── transactions/  # 支付/退款工作流
//! ├── cloud/         # REST 上报、socket 推送
//! ├── pos/           # POS 注入的策略与商品映射
//! └── utils/         # 日志
//! ```

pub mod cloud;
pub mod core;
pub mod orders;
pub mod pos;
pub mod transactions;
pub mod utils;

// Re-export 公共类型
pub use cloud::{CloudReporter, DoshiiClient, RecordingReporter, SocketWorker};
pub use core::{Config, EventRouter, SdkState};
pub use orders::{ManagerError, ManagerResult, OrderStorage, OrdersManager};
pub use pos::{AutoAcceptPolicy, CatalogLookup, OrderingPolicy, PolicyDecision};
pub use transactions::{PaymentReadiness, TransactionsManager};

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
