//! Tempo 共享类型库
//!
//! 服务端与客户端共用的领域模型、消息类型和时间工具：
//!
//! - [`models`] - 领域模型 (账户、会话、考勤、延时、报告、任务、部门)
//! - [`message`] - 消息总线类型 (BusMessage, SyncPayload)
//! - [`util`] - 时间戳、雪花 ID、可注入时钟

pub mod message;
pub mod models;
pub mod util;

pub use util::{Clock, now_millis, snowflake_id};
