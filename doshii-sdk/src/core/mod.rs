//! 核心模块 - SDK 配置、状态和事件路由
//!
//! # 模块结构
//!
//! - [`Config`] - SDK 配置
//! - [`SdkState`] - 工作流共享状态
//! - [`EventRouter`] - CloudEvent 分发

pub mod config;
pub mod event_router;
pub mod state;

pub use config::Config;
pub use event_router::EventRouter;
pub use state::SdkState;
