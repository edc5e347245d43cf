//! Work Task API Handlers
//!
//! 所有写操作先过任务锁：当日日报已提交则整天冻结。
//! 读操作不受锁影响。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::work_task;
use crate::reports::lock;
use crate::services::notification;
use crate::utils::time;
use crate::utils::validation::{MAX_NAME_LEN, MAX_NOTE_LEN, validate_optional_text, validate_required_text};
use crate::utils::{AppError, AppResult};
use shared::models::{
    NotificationKind, Role, SubTask, SubTaskCreate, SubTaskUpdate, WorkTask, WorkTaskCreate,
    WorkTaskUpdate,
};

const RESOURCE: &str = "work_task";

/// Query params for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 默认今天
    pub date: Option<String>,
    /// 仅主管及以上可以查看他人
    pub assignee_id: Option<i64>,
}

/// GET /api/tasks - 某天的任务（含子任务的读取走子任务接口）
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<WorkTask>>> {
    let date = match &query.date {
        Some(d) => {
            time::parse_date(d)?;
            d.clone()
        }
        None => time::daily_period_key(state.clock.today(state.config.timezone)),
    };

    let assignee = match query.assignee_id {
        Some(other) if other != user.id => {
            if !user.has_role(Role::Supervisor) {
                return Err(AppError::forbidden(
                    "Requires SUPERVISOR role to view other assignees",
                ));
            }
            other
        }
        _ => user.id,
    };

    let tasks = work_task::find_by_assignee_date(&state.pool, assignee, &date).await?;
    Ok(Json(tasks))
}

/// POST /api/tasks - 创建任务
///
/// 给他人派任务需要主管及以上，并会投递 TASK_ASSIGNED 通知。
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<WorkTaskCreate>,
) -> AppResult<Json<WorkTask>> {
    validate_required_text(&payload.title, "title", MAX_NAME_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;

    let assignee = payload.assignee_id.unwrap_or(user.id);
    if assignee != user.id && !user.has_role(Role::Supervisor) {
        return Err(AppError::forbidden(
            "Requires SUPERVISOR role to assign tasks to others",
        ));
    }

    let date = match &payload.work_date {
        Some(d) => {
            time::parse_date(d)?;
            d.clone()
        }
        None => time::daily_period_key(state.clock.today(state.config.timezone)),
    };

    lock::ensure_unlocked(&state.pool, assignee, &date).await?;

    let task = work_task::create(
        &state.pool,
        assignee,
        &date,
        user.id,
        &payload,
        state.clock.now_millis(),
    )
    .await?;

    if assignee != user.id {
        notification::notify(
            &state,
            assignee,
            NotificationKind::TaskAssigned,
            "New task assigned",
            &format!("{} assigned you \"{}\" for {}", user.display_name, task.title, date),
        )
        .await;
    }

    let id = task.id.to_string();
    state
        .broadcast_sync(RESOURCE, "created", &id, Some(&task))
        .await;

    Ok(Json(task))
}

async fn load_task_for_mutation(
    state: &ServerState,
    user: &CurrentUser,
    id: i64,
) -> Result<WorkTask, AppError> {
    let task = work_task::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task {} not found", id)))?;

    if task.assignee_id != user.id && task.created_by != user.id && !user.has_role(Role::Supervisor)
    {
        return Err(AppError::forbidden("Not your task"));
    }

    // 锁检查在权限检查之后：无权调用者不应借错误区分锁状态
    lock::ensure_unlocked(&state.pool, task.assignee_id, &task.work_date).await?;

    Ok(task)
}

/// PUT /api/tasks/:id - 更新任务
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<WorkTaskUpdate>,
) -> AppResult<Json<WorkTask>> {
    if let Some(title) = &payload.title {
        validate_required_text(title, "title", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;

    load_task_for_mutation(&state, &user, id).await?;

    let task = work_task::update(&state.pool, id, &payload, state.clock.now_millis()).await?;

    let id_str = task.id.to_string();
    state
        .broadcast_sync(RESOURCE, "status_changed", &id_str, Some(&task))
        .await;

    Ok(Json(task))
}

/// DELETE /api/tasks/:id - 删除任务（锁定前）
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    load_task_for_mutation(&state, &user, id).await?;

    let deleted = work_task::delete(&state.pool, id).await?;

    let id_str = id.to_string();
    state
        .broadcast_sync::<()>(RESOURCE, "deleted", &id_str, None)
        .await;

    Ok(Json(deleted))
}

/// GET /api/tasks/:id/sub-tasks
pub async fn list_sub_tasks(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<SubTask>>> {
    let task = work_task::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task {} not found", id)))?;

    if task.assignee_id != user.id && !user.has_role(Role::Supervisor) {
        return Err(AppError::forbidden("Not your task"));
    }

    let subs = work_task::find_sub_tasks(&state.pool, id).await?;
    Ok(Json(subs))
}

/// POST /api/tasks/:id/sub-tasks
pub async fn create_sub_task(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<SubTaskCreate>,
) -> AppResult<Json<SubTask>> {
    validate_required_text(&payload.title, "title", MAX_NAME_LEN)?;

    load_task_for_mutation(&state, &user, id).await?;

    let sub = work_task::create_sub_task(&state.pool, id, &payload, state.clock.now_millis()).await?;

    let id_str = sub.id.to_string();
    state
        .broadcast_sync(RESOURCE, "sub_task_created", &id_str, Some(&sub))
        .await;

    Ok(Json(sub))
}

/// PUT /api/tasks/sub-tasks/:id
pub async fn update_sub_task(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<SubTaskUpdate>,
) -> AppResult<Json<SubTask>> {
    if let Some(title) = &payload.title {
        validate_required_text(title, "title", MAX_NAME_LEN)?;
    }

    let sub = work_task::find_sub_task(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Sub-task {} not found", id)))?;
    load_task_for_mutation(&state, &user, sub.task_id).await?;

    let sub = work_task::update_sub_task(&state.pool, id, &payload, state.clock.now_millis()).await?;

    let id_str = sub.id.to_string();
    state
        .broadcast_sync(RESOURCE, "sub_task_updated", &id_str, Some(&sub))
        .await;

    Ok(Json(sub))
}

/// DELETE /api/tasks/sub-tasks/:id
pub async fn delete_sub_task(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let sub = work_task::find_sub_task(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Sub-task {} not found", id)))?;
    load_task_for_mutation(&state, &user, sub.task_id).await?;

    let deleted = work_task::delete_sub_task(&state.pool, id).await?;

    let id_str = id.to_string();
    state
        .broadcast_sync::<()>(RESOURCE, "sub_task_deleted", &id_str, None)
        .await;

    Ok(Json(deleted))
}
