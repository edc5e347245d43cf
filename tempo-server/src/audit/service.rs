//! 审计日志服务
//!
//! `AuditService` 通过 mpsc 通道接收日志请求，由后台 worker 异步写入，
//! 查询操作直接读取 storage。写入失败只记错误日志——审计失败绝不
//! 反过来让触发它的认证流程失败。

use std::sync::Arc;

use shared::Clock;
use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageError};
use super::types::{AuditAction, AuditChainVerification, AuditEntry, AuditQuery};

/// 发送到 AuditService 的日志请求
pub struct AuditLogRequest {
    pub timestamp: i64,
    pub action: AuditAction,
    pub account_id: Option<i64>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub message: String,
}

/// 审计日志服务
pub struct AuditService {
    storage: AuditStorage,
    clock: Clock,
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// 创建审计服务，返回 (service, worker 的接收端)
    pub fn new(
        storage: AuditStorage,
        clock: Clock,
        buffer_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let service = Arc::new(Self { storage, clock, tx });
        (service, rx)
    }

    /// 异步记录审计日志（经由通道，不阻塞调用方的写路径）
    ///
    /// 通道满时等待 — 审计日志不允许静默丢弃。
    pub async fn log(
        &self,
        action: AuditAction,
        account_id: Option<i64>,
        ip: Option<String>,
        user_agent: Option<String>,
        message: impl Into<String>,
    ) {
        let req = AuditLogRequest {
            timestamp: self.clock.now_millis(),
            action,
            account_id,
            ip,
            user_agent,
            message: message.into(),
        };

        if self.tx.send(req).await.is_err() {
            tracing::error!("Audit log channel closed — audit entry lost!");
        }
    }

    /// 同步写入（测试和启动场景）
    pub async fn log_sync(
        &self,
        action: AuditAction,
        account_id: Option<i64>,
        message: impl Into<String>,
    ) -> Result<AuditEntry, AuditStorageError> {
        self.storage
            .append(
                self.clock.now_millis(),
                action,
                account_id,
                None,
                None,
                message.into(),
            )
            .await
    }

    /// 查询审计日志
    pub async fn query(
        &self,
        q: &AuditQuery,
    ) -> Result<(Vec<AuditEntry>, i64), AuditStorageError> {
        self.storage.query(q).await
    }

    /// 验证审计链完整性
    pub async fn verify_chain(&self) -> Result<AuditChainVerification, AuditStorageError> {
        self.storage.verify_chain().await
    }

    /// 获取存储引用（worker 使用）
    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }
}
