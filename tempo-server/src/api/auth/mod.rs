//! Auth API 模块 (登录 / 2FA / 密码重置)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/auth", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/login", post(handler::login))
        .route("/logout", post(handler::logout))
        .route("/me", get(handler::me))
        .route("/heartbeat", post(handler::heartbeat))
        .route("/two-factor/setup", post(handler::two_factor_setup))
        .route("/two-factor/disable", post(handler::two_factor_disable))
        .route("/password-reset/request", post(handler::password_reset_request))
        .route("/password-reset/confirm", post(handler::password_reset_confirm))
}
