//! Table Server - 多设备桌台会话与同步服务
//!
//! # 架构概述
//!
//! 同一张桌台上的多台点餐设备共享一个会话。设备可以独立点餐
//! (`different`) 或加入同组共享购物车 (`same`，需要服务员 PIN)。
//!
//! - **会话** (`sessions`): 桌台容量、会话生命周期、设备、同组、购物车
//! - **存储** (`sessions::storage`): 嵌入式 redb，每个操作一个写事务
//! - **消息总线** (`message`): 按房间广播快照
//! - **HTTP API** (`api`): REST + SSE
//!
//! # 模块结构
//!
//! ```text
//! table-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── sessions/      # 会话管理与存储
//! ├── message/       # 房间广播
//! ├── waiter/        # 服务员 PIN 校验
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、运行环境
//! ```

pub mod api;
pub mod core;
pub mod message;
pub mod sessions;
pub mod utils;
pub mod waiter;

// Re-export 公共类型
pub use core::{Config, Server, ServerError, ServerState};
pub use message::{Broadcaster, MessageBus};
pub use sessions::{SessionError, SessionManager, SessionStorage};
pub use utils::setup_environment;
pub use waiter::{StaticPinVerifier, WaiterPinVerifier};

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
 _______    __    __
/_  __/ /_ / /__ / /__
 / / / _ `/ _ \/ / -_)
/_/  \_,_/_.__/_/\__/   server v{}
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
