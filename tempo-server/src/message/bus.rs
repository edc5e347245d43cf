//! 消息总线核心实现
//!
//! ```text
//! Server ──▶ publish() ──▶ broadcast::Sender<BusMessage>
//!                                   │
//!                       ┌───────────┴───────────┐
//!                       ▼                       ▼
//!                 WebSocket 客户端 A      WebSocket 客户端 B
//! ```
//!
//! 慢消费者滞后超过通道容量时丢弃最旧的消息（客户端据 version 重拉），
//! 不回压业务写路径。

use shared::message::BusMessage;
use tokio::sync::broadcast;

/// 广播通道容量
const CHANNEL_CAPACITY: usize = 1024;

/// 消息总线 - 负责服务器到客户端的广播
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<BusMessage>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// 发布一条消息 (fire-and-forget)
    ///
    /// 没有任何订阅者时 send 返回 Err——这不是错误，静默忽略。
    pub fn publish(&self, message: BusMessage) {
        let _ = self.tx.send(message);
    }

    /// 订阅广播流（每个 WebSocket 连接一个接收端）
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{EventType, SyncPayload};

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let bus = MessageBus::new();
        // Must not panic or error
        bus.publish(BusMessage::force_logout(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_sync_frames() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe();

        bus.publish(BusMessage::sync(&SyncPayload {
            resource: "work_task".into(),
            version: 1,
            action: "created".into(),
            id: "42".into(),
            data: None,
        }));

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, EventType::Sync);
        assert_eq!(msg.payload["resource"], "work_task");
    }
}
