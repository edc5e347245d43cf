//! Department API 模块 (部门与部门汇总)

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use shared::models::Role;

use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/departments", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}/reports", get(handler::list_reports));

    let manager_routes = Router::new()
        .route("/", post(handler::create))
        .route("/{id}/rollup", post(handler::rollup))
        .layer(middleware::from_fn(require_role(Role::Manager)));

    read_routes.merge(manager_routes)
}
