//! 主应用程序入口
//!
//! 加载配置，启动中枢任务与 Axum Web 服务。

use std::{sync::Arc, time::Duration};

use application::{
    Hub, HubDependencies, HubSettings, IdentityVerifier, SystemClock, TrustingVerifier,
};
use config::AppConfig;
use infrastructure::{spawn_hub, ChannelMessageArchive, JwtIdentityVerifier};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "配置已加载");

    let identity: Arc<dyn IdentityVerifier> = match &config.auth.jwt_secret {
        Some(secret) => {
            tracing::info!("启用 JWT 身份校验");
            Arc::new(JwtIdentityVerifier::new(secret))
        }
        None => {
            tracing::warn!("未配置 jwt_secret，直接信任客户端声明的 user_id");
            Arc::new(TrustingVerifier)
        }
    };
    let (archive, archive_task) = ChannelMessageArchive::spawn_logging();

    let hub = Hub::new(
        HubSettings::from(&config.hub),
        HubDependencies {
            clock: Arc::new(SystemClock),
            archive: Arc::new(archive),
            identity,
        },
    );
    let (hub_handle, hub_task) = spawn_hub(hub, &config.metrics, config.hub.command_buffer);

    let app = router(AppState::new(hub_handle), &config.server);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("实时中枢启动在 http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 所有连接释放句柄后中枢任务退出，归档通道随之关闭
    match tokio::time::timeout(SHUTDOWN_GRACE, hub_task).await {
        Ok(result) => {
            result?;
            let archived = archive_task.await?;
            tracing::info!(archived, "服务已停止");
        }
        Err(_) => tracing::warn!("仍有连接未释放，放弃等待中枢任务"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听退出信号");
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号，开始优雅关闭");
}
