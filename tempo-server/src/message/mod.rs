//! 实时消息模块
//!
//! 进程内广播总线 + WebSocket 扇出。fire-and-forget：没有订阅者、
//! 通道滞后、连接断开都不会影响触发广播的状态变更。

pub mod bus;

pub use bus::MessageBus;
