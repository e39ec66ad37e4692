use crate::sessions::StorageError;
use thiserror::Error;

/// Errors while bringing the server up or serving
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("存储初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

/// 服务器层 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
