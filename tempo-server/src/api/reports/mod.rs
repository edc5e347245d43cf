//! Report API 模块 (报告生命周期)

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use shared::models::Role;

use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reports", routes())
}

fn routes() -> Router<ServerState> {
    let own_routes = Router::new()
        .route("/", get(handler::mine).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/submit", post(handler::submit));

    let supervisor_routes = Router::new()
        .route("/queue/supervisor", get(handler::supervisor_queue))
        .route("/{id}/supervisor-approve", post(handler::supervisor_approve))
        .route("/{id}/reject", post(handler::reject))
        .layer(middleware::from_fn(require_role(Role::Supervisor)));

    let manager_routes = Router::new()
        .route("/queue/head", get(handler::head_queue))
        .route("/queue/manager", get(handler::manager_queue))
        .route("/{id}/head-approve", post(handler::head_approve))
        .route("/{id}/manager-approve", post(handler::manager_approve))
        .layer(middleware::from_fn(require_role(Role::Manager)));

    own_routes.merge(supervisor_routes).merge(manager_routes)
}
