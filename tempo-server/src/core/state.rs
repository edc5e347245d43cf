//! 服务器状态

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use shared::Clock;
use shared::message::{BusMessage, SyncPayload};
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::audit::service::AuditLogRequest;
use crate::audit::{AuditService, AuditStorage};
use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::message::MessageBus;

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每种资源类型维护独立的版本号，支持原子递增。
/// broadcast_sync 用它生成递增版本号，客户端据此丢弃乱序到达的旧数据。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定资源的当前版本号（不存在返回 0）
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | clock | Clock | 可注入时钟 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | audit | Arc<AuditService> | 审计日志服务 |
/// | bus | MessageBus | 实时广播总线 |
/// | resource_versions | Arc<ResourceVersions> | 资源版本管理 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub clock: Clock,
    pub jwt_service: Arc<JwtService>,
    pub audit: Arc<AuditService>,
    pub bus: MessageBus,
    pub resource_versions: Arc<ResourceVersions>,
    /// 审计 worker 的接收端，start_background_tasks 取走一次
    audit_rx: Arc<Mutex<Option<mpsc::Receiver<AuditLogRequest>>>>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：工作目录 → 数据库 (migrations) → JWT / 审计 / 总线。
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        let work_dir = PathBuf::from(&config.work_dir);
        if !work_dir.exists() {
            std::fs::create_dir_all(&work_dir).expect("Failed to create work directory");
        }

        let db_path = work_dir.join("tempo.db");
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");

        Self::with_pool(config.clone(), db_service.pool, Clock::system())
    }

    /// 从现成的连接池构造状态（集成测试用 in-memory 池 + 固定时钟）
    pub fn with_pool(config: Config, pool: SqlitePool, clock: Clock) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let storage = AuditStorage::new(pool.clone());
        let (audit, audit_rx) =
            AuditService::new(storage, clock.clone(), config.audit_buffer_size);
        let bus = MessageBus::new();

        Self {
            config,
            pool,
            clock,
            jwt_service,
            audit,
            bus,
            resource_versions: Arc::new(ResourceVersions::new()),
            audit_rx: Arc::new(Mutex::new(Some(audit_rx))),
        }
    }

    /// 取走审计 worker 的接收端（只能调用一次）
    pub fn take_audit_rx(&self) -> Option<mpsc::Receiver<AuditLogRequest>> {
        self.audit_rx.lock().expect("audit_rx mutex poisoned").take()
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 广播同步消息
    ///
    /// 向所有已连接客户端广播资源变更通知，版本号自动递增。
    /// fire-and-forget：没有订阅者或通道满都不会影响调用方。
    ///
    /// # 参数
    /// - `resource`: 资源类型 (如 "work_task", "report", "extension")
    /// - `action`: 变更类型 ("created", "updated", "deleted", "status_changed")
    /// - `id`: 资源 ID
    /// - `data`: 资源数据 (deleted 时为 None)
    pub async fn broadcast_sync<T: serde::Serialize>(
        &self,
        resource: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) {
        let version = self.resource_versions.increment(resource);
        let payload = SyncPayload {
            resource: resource.to_string(),
            version,
            action: action.to_string(),
            id: id.to_string(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        self.bus.publish(BusMessage::sync(&payload));
    }
}
