//! Time Extension API 模块 (加班延时)

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use shared::models::Role;

use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/extensions", routes())
}

fn routes() -> Router<ServerState> {
    let own_routes = Router::new()
        .route("/", post(handler::create))
        .route("/mine", get(handler::mine));

    let decide_routes = Router::new()
        .route("/pending", get(handler::pending))
        .route("/{id}/approve", post(handler::approve))
        .route("/{id}/reject", post(handler::reject))
        .layer(middleware::from_fn(require_role(Role::Supervisor)));

    own_routes.merge(decide_routes)
}
