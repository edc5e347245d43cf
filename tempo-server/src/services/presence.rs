//! 在线状态
//!
//! 在线标记和最后活跃时间的变更全部收口到这里——登录、心跳接口、
//! WebSocket 连接/断开都调用同一条路径，而不是各自去改 account 行。

use crate::core::ServerState;
use crate::db::repository::account;
use crate::utils::AppError;

/// 心跳：标记在线并刷新最后活跃时间
pub async fn heartbeat(state: &ServerState, account_id: i64) -> Result<(), AppError> {
    account::set_presence(&state.pool, account_id, true, state.clock.now_millis()).await?;
    Ok(())
}

/// 下线：登出 / 强制下线 / WebSocket 断开
pub async fn mark_offline(state: &ServerState, account_id: i64) -> Result<(), AppError> {
    account::set_presence(&state.pool, account_id, false, state.clock.now_millis()).await?;
    Ok(())
}
