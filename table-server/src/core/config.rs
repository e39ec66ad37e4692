use crate::core::ServerError;
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/table-server | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | WAITER_PINS | (空) | 服务员 PIN 列表, `1234:Ana,5678:Luis` |
/// | ORDER_COOLDOWN_SECS | 120 | 两次下单之间的建议间隔 |
/// | BUS_CHANNEL_CAPACITY | 1024 | 广播通道容量 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/tables HTTP_PORT=8080 WAITER_PINS=1234:Ana cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// Raw waiter PIN list
    pub waiter_pins: String,
    pub order_cooldown: Duration,
    pub bus_channel_capacity: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/table-server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            waiter_pins: std::env::var("WAITER_PINS").unwrap_or_default(),
            order_cooldown: Duration::from_secs(
                std::env::var("ORDER_COOLDOWN_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(120),
            ),
            bus_channel_capacity: std::env::var("BUS_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(1024),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// redb 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
            .join("database")
            .join("sessions.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 启动前校验
    ///
    /// 生产环境必须配置服务员 PIN，否则同组加入永远被拒绝
    pub fn validate(&self) -> crate::core::Result<()> {
        if self.work_dir.trim().is_empty() {
            return Err(ServerError::Config("WORK_DIR must not be empty".into()));
        }
        if self.is_production() && self.waiter_pins.trim().is_empty() {
            return Err(ServerError::Config(
                "WAITER_PINS is required in production".into(),
            ));
        }
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
