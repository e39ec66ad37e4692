use crate::core::{Config, Result};
use crate::message::MessageBus;
use crate::sessions::{SessionError, SessionManager, SessionStorage};
use crate::waiter::StaticPinVerifier;
use shared::error::AppError;
use std::sync::Arc;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，每个请求克隆一份。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | sessions | Arc<SessionManager> | 桌台会话管理 |
/// | message_bus | Arc<MessageBus> | 房间事件广播 |
/// | pins | Arc<StaticPinVerifier> | 服务员 PIN 列表 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    pub message_bus: Arc<MessageBus>,
    pub pins: Arc<StaticPinVerifier>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 0. 配置校验
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/sessions.redb)
    /// 3. 消息总线、PIN 列表、会话管理器
    pub fn initialize(config: &Config) -> Result<Self> {
        config.validate()?;
        let db_path = config.database_path();
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let storage = SessionStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Session database opened");

        Ok(Self::with_storage(config.clone(), storage))
    }

    /// Build the state around an already opened storage (tests use the
    /// in-memory backend)
    pub fn with_storage(config: Config, storage: SessionStorage) -> Self {
        let message_bus = Arc::new(MessageBus::with_capacity(config.bus_channel_capacity));
        let pins = Arc::new(StaticPinVerifier::from_list(&config.waiter_pins));
        let sessions = SessionManager::new(storage, message_bus.clone(), pins.clone())
            .with_order_cooldown(config.order_cooldown);

        Self {
            config,
            sessions: Arc::new(sessions),
            message_bus,
            pins,
        }
    }

    /// Run a session manager call off the async runtime
    ///
    /// The manager blocks on redb write transactions, so handlers never call
    /// it directly from a runtime worker.
    pub async fn run_blocking<T, F>(&self, f: F) -> std::result::Result<T, AppError>
    where
        F: FnOnce(&SessionManager) -> std::result::Result<T, SessionError> + Send + 'static,
        T: Send + 'static,
    {
        let sessions = self.sessions.clone();
        tokio::task::spawn_blocking(move || f(&sessions))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Session task failed");
                AppError::internal("session task failed")
            })?
            .map_err(AppError::from)
    }
}
