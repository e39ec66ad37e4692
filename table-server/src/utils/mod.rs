//! 工具模块
//!
//! - 日志初始化
//! - 运行环境准备

pub mod logger;

use crate::core::Config;

/// 设置运行环境: `.env`、工作目录、日志
pub fn setup_environment() -> std::io::Result<Config> {
    // .env 文件是可选的
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_dir = config.is_production().then(|| log_dir.to_string_lossy().into_owned());
    logger::init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        log_dir.as_deref(),
    );
    Ok(config)
}
