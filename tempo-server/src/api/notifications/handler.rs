//! Notification API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::notification;
use crate::utils::{AppError, AppResult};
use shared::models::Notification;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i32,
}

fn default_limit() -> i32 {
    50
}

/// GET /api/notifications - 自己的通知
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let items =
        notification::find_by_account(&state.pool, user.id, query.unread_only, query.limit).await?;
    Ok(Json(items))
}

/// POST /api/notifications/:id/read - 标记已读
pub async fn mark_read(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let updated = notification::mark_read(&state.pool, id, user.id).await?;
    if !updated {
        return Err(AppError::not_found(format!("Notification {} not found", id)));
    }
    Ok(Json(true))
}
