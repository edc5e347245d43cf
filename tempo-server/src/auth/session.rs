//! 会话登记
//!
//! 每账户同时有效会话数封顶 [`MAX_ACTIVE_SESSIONS`]；
//! 超出时按创建顺序淘汰最旧的活跃会话。

use shared::Clock;
use shared::models::Session;
use sqlx::SqlitePool;

use crate::audit::{AuditAction, AuditService};
use crate::auth::extractor::RequestMeta;
use crate::db::repository::{account, session};
use crate::utils::AppError;

/// 每账户最大并发会话数
pub const MAX_ACTIVE_SESSIONS: usize = 3;

/// 登记新会话
///
/// 活跃数已达上限时，先停用最旧的活跃会话（审计 `SessionEvicted`），
/// 再创建新会话。
pub async fn register(
    pool: &SqlitePool,
    audit: &AuditService,
    clock: &Clock,
    account_id: i64,
    ttl_hours: i64,
    meta: &RequestMeta,
) -> Result<Session, AppError> {
    let now = clock.now_millis();

    let active = session::find_active(pool, account_id, now).await?;
    if active.len() >= MAX_ACTIVE_SESSIONS {
        // 淘汰到上限以下（正常只会有一条，防御性处理历史超额）
        let evict_count = active.len() + 1 - MAX_ACTIVE_SESSIONS;
        for oldest in active.iter().take(evict_count) {
            session::deactivate(pool, oldest.id).await?;
            audit
                .log(
                    AuditAction::SessionEvicted,
                    Some(account_id),
                    meta.ip.clone(),
                    meta.user_agent.clone(),
                    format!("Oldest session {} evicted by new login", oldest.id),
                )
                .await;
        }
    }

    let expires_at = now + ttl_hours * 60 * 60 * 1000;
    let created = session::create(
        pool,
        account_id,
        now,
        expires_at,
        meta.ip.clone(),
        meta.user_agent.clone(),
    )
    .await?;

    Ok(created)
}

/// 会话是否有效（活跃 + 未过期）
pub async fn is_active(
    pool: &SqlitePool,
    clock: &Clock,
    session_id: i64,
) -> Result<bool, AppError> {
    let now = clock.now_millis();
    let session = session::find_by_id(pool, session_id).await?;
    Ok(session.map(|s| s.is_valid_at(now)).unwrap_or(false))
}

/// 强制下线：停用该账户全部会话并清除在线标记。
///
/// 由管理员/经理触发，或密码重置后调用。
pub async fn invalidate_all(
    pool: &SqlitePool,
    clock: &Clock,
    account_id: i64,
) -> Result<u64, AppError> {
    let count = session::deactivate_all(pool, account_id).await?;
    account::set_presence(pool, account_id, false, clock.now_millis()).await?;
    Ok(count)
}

/// 显式登出：停用单个会话。
pub async fn logout(pool: &SqlitePool, session_id: i64) -> Result<(), AppError> {
    session::deactivate(pool, session_id).await?;
    Ok(())
}
