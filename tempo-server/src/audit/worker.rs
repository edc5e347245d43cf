//! 审计日志后台 worker
//!
//! 从 mpsc 通道取请求，逐条写入存储。注册为 `TaskKind::Worker`。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::service::AuditLogRequest;
use super::storage::AuditStorage;

/// 运行审计写入循环，直到通道关闭或收到关机信号。
///
/// 关机时先排空通道中剩余的请求再退出。
pub async fn run(
    storage: AuditStorage,
    mut rx: mpsc::Receiver<AuditLogRequest>,
    shutdown: CancellationToken,
) {
    tracing::info!("Audit log worker started");

    loop {
        tokio::select! {
            req = rx.recv() => {
                match req {
                    Some(req) => write_entry(&storage, req).await,
                    None => {
                        tracing::warn!("Audit log channel closed, worker exiting");
                        return;
                    }
                }
            }
            _ = shutdown.cancelled() => {
                // 排空剩余条目
                while let Ok(req) = rx.try_recv() {
                    write_entry(&storage, req).await;
                }
                tracing::info!("Audit log worker stopped");
                return;
            }
        }
    }
}

async fn write_entry(storage: &AuditStorage, req: AuditLogRequest) {
    if let Err(e) = storage
        .append(
            req.timestamp,
            req.action,
            req.account_id,
            req.ip,
            req.user_agent,
            req.message,
        )
        .await
    {
        tracing::error!("Failed to write audit entry: {:?}", e);
    }
}
