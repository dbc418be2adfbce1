use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::infrastructure::{ChromiumLauncher, SurfaceFactory};
use crate::orchestrator::{EmissionExecutor, TaskOrchestrator};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: Arc<TaskOrchestrator>,
    router: Router,
}

impl App {
    /// 初始化应用：准备下载目录，使用 Chromium 驱动门户
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        std::fs::create_dir_all(&config.download_dir)
            .with_context(|| format!("无法创建下载目录: {}", config.download_dir.display()))?;

        let launcher = ChromiumLauncher::new(
            config.chrome_executable.clone(),
            config.browser_debug_port,
            config.timeouts.poll(),
        );
        Ok(Self::with_factory(config, Arc::new(launcher)))
    }

    /// 使用指定的会话工厂组装应用
    pub fn with_factory(config: Config, factory: Arc<dyn SurfaceFactory>) -> Self {
        let executor = EmissionExecutor::new(factory, &config);
        let orchestrator = Arc::new(TaskOrchestrator::new(executor, config.max_concurrent_emissions));
        let router = create_router(Arc::new(ApiState::new(orchestrator.clone())));
        Self {
            config,
            orchestrator,
            router,
        }
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// 提供 HTTP 服务直到 Ctrl-C，然后等待在途任务结束
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.api_host, self.config.api_port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听地址: {}", addr))?;
        info!("🌐 HTTP 服务已启动: http://{}", addr);

        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP 服务异常退出")?;

        self.orchestrator.shutdown().await;

        let counts = self.orchestrator.counts();
        logging::log_shutdown(counts.completed, counts.failed, counts.total());
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 收到停止信号，不再接受新请求"),
        Err(e) => {
            warn!("无法监听停止信号: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
