use std::path::PathBuf;
use std::time::Duration;

/// SDK 配置 - Doshii 集成的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DOSHII_API_URL | https://sandbox.doshii.co/partner/v3 | REST API 地址 |
/// | DOSHII_SOCKET_URL | wss://sandbox-socket.doshii.co/pos/socket | 订单推送 socket 地址 |
/// | DOSHII_VENDOR_TOKEN | (空) | 供应商 token，为空时离线运行 |
/// | DOSHII_LOCATION_ID | (空) | 门店 location id |
/// | WORK_DIR | ./doshii-data | 工作目录 (redb 数据库) |
/// | REPORT_TIMEOUT_MS | 30000 | 单次上报超时(毫秒) |
/// | SOCKET_PING_INTERVAL_SECS | 30 | socket 心跳间隔(秒) |
/// | SOCKET_TIMEOUT_SECS | 90 | socket 静默超时(秒) |
/// | PLACEHOLDER_PRODUCT_ID | doshii-unmapped | 未映射商品的占位商品 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，设置后按天滚动写文件 |
///
/// # 示例
///
/// ```ignore
/// DOSHII_VENDOR_TOKEN=xxx DOSHII_LOCATION_ID=loc-1 cargo run -p sample-pos
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Doshii partner REST API 地址
    pub api_url: String,
    /// Doshii socket 地址
    pub socket_url: String,
    /// 供应商 bearer token
    pub vendor_token: String,
    /// 门店 location id
    pub location_id: String,
    /// 工作目录，存储 redb 数据库
    pub work_dir: String,
    /// 单次上报超时 (毫秒)
    pub report_timeout_ms: u64,
    /// socket 心跳间隔 (秒)
    pub socket_ping_interval_secs: u64,
    /// socket 静默超时 (秒)，超过即重连
    pub socket_timeout_secs: u64,
    /// 未映射商品的占位商品引用
    pub placeholder_product_id: String,
    /// 日志级别
    pub log_level: String,
    /// 日志目录
    pub log_dir: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse_or(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            api_url: env_or("DOSHII_API_URL", "https://sandbox.doshii.co/partner/v3"),
            socket_url: env_or(
                "DOSHII_SOCKET_URL",
                "wss://sandbox-socket.doshii.co/pos/socket",
            ),
            vendor_token: env_or("DOSHII_VENDOR_TOKEN", ""),
            location_id: env_or("DOSHII_LOCATION_ID", ""),
            work_dir: env_or("WORK_DIR", "./doshii-data"),
            report_timeout_ms: env_parse_or("REPORT_TIMEOUT_MS", 30000),
            socket_ping_interval_secs: env_parse_or("SOCKET_PING_INTERVAL_SECS", 30),
            socket_timeout_secs: env_parse_or("SOCKET_TIMEOUT_SECS", 90),
            placeholder_product_id: env_or("PLACEHOLDER_PRODUCT_ID", "doshii-unmapped"),
            log_level: env_or("LOG_LEVEL", "info"),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// 使用自定义工作目录
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 没有 token 时不连接 Doshii
    pub fn is_offline(&self) -> bool {
        self.vendor_token.is_empty()
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.report_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.socket_ping_interval_secs)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }

    /// redb 数据库路径
    pub fn orders_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
