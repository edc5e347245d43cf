//! 站内通知
//!
//! fire-and-forget：写入失败只记日志，绝不让触发它的业务操作失败。
//! 投递保证到 inbox 行为止，邮件等外部通道不属于本系统。

use shared::models::NotificationKind;

use crate::core::ServerState;
use crate::db::repository::notification;

/// 写入一条通知并广播 Notify 帧
pub async fn notify(
    state: &ServerState,
    account_id: i64,
    kind: NotificationKind,
    title: &str,
    body: &str,
) {
    match notification::create(
        &state.pool,
        account_id,
        kind,
        title,
        body,
        state.clock.now_millis(),
    )
    .await
    {
        Ok(_) => {
            state
                .bus
                .publish(shared::message::BusMessage::notify(account_id, kind.as_str()));
        }
        Err(e) => {
            tracing::warn!(account_id, kind = kind.as_str(), "Failed to write notification: {}", e);
        }
    }
}
