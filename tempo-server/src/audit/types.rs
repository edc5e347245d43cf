//! 审计日志类型定义
//!
//! 认证相关事件的核心数据结构。
//! 所有条目不可变、不可删除，支持 SHA256 哈希链防篡改。

use serde::{Deserialize, Serialize};

/// 审计操作类型（枚举，非自由文本）
///
/// 每个认证敏感操作都有明确的类型标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    // ═══ 登录 ═══
    /// 登录成功
    LoginSuccess,
    /// 登录失败（密码错误）
    LoginFailed,
    /// 第二因子校验失败
    SecondFactorFailed,
    /// 登出
    Logout,

    // ═══ 锁定 ═══
    /// 连续失败触发锁定 / 管理员手动锁定
    UserLock,
    /// 锁定解除（惰性过期 / 管理员解锁）
    UserUnlock,

    // ═══ 会话 ═══
    /// 超出并发上限，最旧会话被挤下线
    SessionEvicted,
    /// 管理员/经理强制下线
    ForcedLogout,

    // ═══ 密码重置 ═══
    /// 重置申请
    PasswordResetRequested,
    /// 重置完成
    PasswordResetCompleted,

    // ═══ 延时 ═══
    /// 延时批准
    ExtensionApproved,
    /// 延时驳回
    ExtensionRejected,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 审计日志条目（不可变）
///
/// 每条记录包含 SHA256 哈希链，确保防篡改。
/// - `prev_hash`: 前一条记录的哈希
/// - `curr_hash`: 当前记录的哈希（包含 prev_hash + 所有字段）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    /// 全局递增序列号（唯一标识）
    pub id: i64,
    /// 时间戳（Unix 毫秒）
    pub timestamp: i64,
    /// 操作类型
    pub action: AuditAction,
    /// 相关账户 ID（系统事件为 None）
    pub account_id: Option<i64>,
    /// 来源 IP
    pub ip: Option<String>,
    /// User-Agent
    pub user_agent: Option<String>,
    /// 人类可读消息
    pub message: String,
    /// 前一条审计日志哈希
    pub prev_hash: String,
    /// 当前记录哈希（SHA256）
    pub curr_hash: String,
}

/// 审计日志查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    /// 起始时间（Unix 毫秒，含）
    pub from: Option<i64>,
    /// 截止时间（Unix 毫秒，含）
    pub to: Option<i64>,
    /// 操作类型过滤
    pub action: Option<AuditAction>,
    /// 账户过滤
    pub account_id: Option<i64>,
    /// 分页偏移
    #[serde(default)]
    pub offset: i64,
    /// 分页大小（默认 50）
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// 审计日志列表响应
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
    pub total: i64,
}

/// 审计链验证结果
#[derive(Debug, Serialize)]
pub struct AuditChainVerification {
    /// 验证的记录总数
    pub total_entries: i64,
    /// 链是否完整
    pub chain_intact: bool,
    /// 断裂点序列号列表
    pub breaks: Vec<i64>,
}
