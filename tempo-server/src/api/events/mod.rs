//! Realtime Events API 模块 (WebSocket)
//!
//! `GET /api/events?token=<jwt>` — 浏览器 WebSocket 无法携带
//! Authorization 头，握手改用 query token 校验。连接期间转发总线上的
//! 全部 [`BusMessage`]；任何来自客户端的帧都当作在线心跳。

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events", get(handler::events))
}
