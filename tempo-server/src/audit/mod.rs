//! 审计日志模块
//!
//! 认证相关事件（登录成败、锁定/解锁、强制下线、密码重置、延时决定）
//! 的不可变记录：
//!
//! - [`types`] - AuditAction / AuditEntry / 查询类型
//! - [`storage`] - SQLite 追加写存储 + SHA256 哈希链
//! - [`service`] - mpsc 异步写入服务
//! - [`worker`] - 后台写入循环

pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use service::AuditService;
pub use storage::AuditStorage;
pub use types::{AuditAction, AuditEntry, AuditListResponse, AuditQuery};
