//! 数据库工具服务
//!
//! 以工具调用的形式提供：
//! - 命名数据库连接的注册与替换
//! - 受策略限制的 SQL 查询（仅 SELECT / INSERT）
//! - 连接状态列表

mod drivers;
mod environment;
mod gateway;
mod handlers;
mod registry;
mod render;
mod routes;
mod state;
mod tools;

#[cfg(test)]
mod testing;

use anyhow::Context;
use common::config::AppConfig;
use state::AppState;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "db-tool-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 为可选文件，已存在的环境变量优先
    dotenv::dotenv().ok();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::load_with_service(SERVICE_NAME);
    let state = AppState::new(config.clone());
    let registry = state.registry().clone();
    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(
        service = SERVICE_NAME,
        address = %addr,
        drivers = ?registry.catalog().supported(),
        "启动服务"
    );

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务运行失败")?;

    registry.close_all().await;
    info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听退出信号");
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，正在关闭连接");
}
