//! Audit Log API 模块 (审计日志查询，管理员)

mod handler;

use axum::{Router, middleware, routing::get};
use shared::models::Role;

use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/audit-log", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::query))
        .route("/verify", get(handler::verify_chain))
        .layer(middleware::from_fn(require_role(Role::Administrator)))
}
