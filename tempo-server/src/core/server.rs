//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::audit;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError, ServerState};
use crate::reports::ReportScheduler;

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (tests share the same state)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// 注册后台任务：审计写入 worker + 报告定时调度器
    pub fn start_background_tasks(state: &ServerState) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        if let Some(rx) = state.take_audit_rx() {
            let storage = state.audit.storage().clone();
            let shutdown = tasks.shutdown_token();
            tasks.spawn("audit_worker", TaskKind::Worker, async move {
                audit::worker::run(storage, rx, shutdown).await;
            });
        }

        let scheduler = ReportScheduler::new(state.clone(), tasks.shutdown_token());
        tasks.spawn("report_scheduler", TaskKind::Periodic, async move {
            scheduler.run().await;
        });

        tasks.log_summary();
        tasks
    }

    pub async fn run(&self) -> Result<()> {
        // Create application state if not provided
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        let tasks = Self::start_background_tasks(&state);

        let app = crate::api::build_app(&state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Tempo server listening on {}", addr);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.into()))?;

        tasks.shutdown().await;

        Ok(())
    }
}
