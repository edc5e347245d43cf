//! Account API 模块 (账户管理)

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use shared::models::Role;

use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/accounts", routes())
}

fn routes() -> Router<ServerState> {
    let admin_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
        .route("/{id}/lock", post(handler::lock))
        .route("/{id}/unlock", post(handler::unlock))
        .layer(middleware::from_fn(require_role(Role::Administrator)));

    let manager_routes = Router::new()
        .route("/{id}/force-logout", post(handler::force_logout))
        .layer(middleware::from_fn(require_role(Role::Manager)));

    let self_routes = Router::new().route("/me/month-end-day", put(handler::set_month_end_day));

    admin_routes.merge(manager_routes).merge(self_routes)
}
