//! 轻量服务
//!
//! - [`presence`] - 在线状态的唯一写入口（心跳）
//! - [`notification`] - 站内通知 fire-and-forget 写入

pub mod notification;
pub mod presence;
