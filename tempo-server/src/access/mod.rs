//! 访问控制模块
//!
//! 两层门禁：
//!
//! - [`working_hours`] - 组织级工作时间硬闸（全员，先于按用户决策）
//! - [`engine`] - 按用户考勤/延时决策（每请求重新评估）
//!
//! 组合方式见 [`crate::auth::middleware`]。

pub mod engine;
pub mod working_hours;

pub use engine::{AccessDecision, AllowReason, DenyReason, decide, has_live_extension};
pub use working_hours::WorkingHours;
