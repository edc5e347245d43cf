//! 消息总线类型
//!
//! 服务器与已连接客户端之间的实时广播消息。
//! 传输是 fire-and-forget：投递失败绝不反过来影响触发它的状态变更。

mod payload;

pub use payload::{BusMessage, EventType, SyncPayload};
