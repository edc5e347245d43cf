//! Work Task API 模块 (任务与子任务)

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tasks", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", put(handler::update).delete(handler::delete))
        .route("/{id}/sub-tasks", get(handler::list_sub_tasks).post(handler::create_sub_task))
        .route(
            "/sub-tasks/{id}",
            put(handler::update_sub_task).delete(handler::delete_sub_task),
        )
}
