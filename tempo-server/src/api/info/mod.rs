//! 信息页 API 模块
//!
//! 工作时间硬闸把窗口外的请求重定向到这里，而不是在数据层拒绝。

use axum::{Json, Router, extract::State, routing::get};
use chrono::Datelike;
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/info/outside-hours", get(outside_hours))
}

/// GET /api/info/outside-hours - 今天的开放窗口说明
async fn outside_hours(State(state): State<ServerState>) -> AppResult<Json<Value>> {
    let now = state.clock.now_in(state.config.timezone);
    let window = state.config.working_hours.window_for(now.weekday());

    Ok(Json(json!({
        "message": "The system is outside organizational working hours",
        "timezone": state.config.timezone.name(),
        "today": now.date_naive().to_string(),
        "window": window.map(|(open, close)| {
            json!({ "open": open.format("%H:%M").to_string(),
                    "close": close.format("%H:%M").to_string() })
        }),
        "hint": "Ask a supervisor to approve a time extension for after-hours access",
    })))
}
