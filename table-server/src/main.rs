use table_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志) 并加载配置
    let config = setup_environment()?;

    print_banner();
    tracing::info!(work_dir = %config.work_dir, "Table server starting...");

    // 2. 初始化服务器状态 (数据库、消息总线、PIN 列表)
    let state = ServerState::initialize(&config)?;
    if state.pins.is_empty() {
        tracing::warn!("WAITER_PINS is empty, same-group joins will be rejected");
    }

    // 3. 启动 HTTP 服务器
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
