//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`info`] - 信息页（工作时间外重定向目标）
//! - [`auth`] - 登录 / 登出 / 2FA / 密码重置 / 心跳
//! - [`accounts`] - 账户管理（锁定、解锁、强制下线、安全设置）
//! - [`attendance`] - 打卡
//! - [`extensions`] - 加班延时申请与审批
//! - [`reports`] - 报告生命周期与审批队列
//! - [`work_tasks`] - 任务与子任务
//! - [`departments`] - 部门与部门汇总
//! - [`audit_log`] - 审计日志查询
//! - [`notifications`] - 站内通知
//! - [`events`] - WebSocket 实时事件流

pub mod accounts;
pub mod attendance;
pub mod audit_log;
pub mod auth;
pub mod departments;
pub mod events;
pub mod extensions;
pub mod health;
pub mod info;
pub mod notifications;
pub mod reports;
pub mod work_tasks;

use axum::Router;
use axum::middleware as axum_middleware;
use http::HeaderValue;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::middleware;
use crate::core::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResponse, AppResult};

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).unwrap()))
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(info::router())
        .merge(auth::router())
        .merge(accounts::router())
        .merge(attendance::router())
        .merge(extensions::router())
        .merge(reports::router())
        .merge(work_tasks::router())
        .merge(departments::router())
        .merge(audit_log::router())
        .merge(notifications::router())
        .merge(events::router())
}

/// Build a fully configured application with all middleware and state
pub fn build_app(state: &ServerState) -> Router {
    let request_id_header = http::HeaderName::from_static("x-request-id");

    build_router()
        // ========== 门禁中间件 (由内向外: attendance → working hours → auth) ==========
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::attendance_gate,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::working_hours_gate,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        // ========== Tower HTTP Middleware ==========
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, XRequestId))
        .with_state(state.clone())
}
