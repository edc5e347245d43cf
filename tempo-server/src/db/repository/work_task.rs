//! Work Task Repository
//!
//! Mutations are guarded by the task lock in `reports::lock` at the engine
//! layer; this module is plain storage.

use super::{RepoError, RepoResult};
use shared::models::{
    SubTask, SubTaskCreate, SubTaskUpdate, WorkTask, WorkTaskCreate, WorkTaskUpdate,
};
use shared::snowflake_id;
use sqlx::SqlitePool;

const TASK_COLUMNS: &str =
    "id, assignee_id, work_date, title, description, status, created_by, created_at, updated_at";
const SUB_COLUMNS: &str = "id, task_id, title, status, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<WorkTask>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM work_task WHERE id = ?");
    let task = sqlx::query_as::<_, WorkTask>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(task)
}

pub async fn find_by_assignee_date(
    pool: &SqlitePool,
    assignee_id: i64,
    work_date: &str,
) -> RepoResult<Vec<WorkTask>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM work_task WHERE assignee_id = ? AND work_date = ? \
         ORDER BY created_at ASC"
    );
    let tasks = sqlx::query_as::<_, WorkTask>(&sql)
        .bind(assignee_id)
        .bind(work_date)
        .fetch_all(pool)
        .await?;
    Ok(tasks)
}

pub async fn create(
    pool: &SqlitePool,
    assignee_id: i64,
    work_date: &str,
    created_by: i64,
    data: &WorkTaskCreate,
    now: i64,
) -> RepoResult<WorkTask> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO work_task (id, assignee_id, work_date, title, description, status, \
         created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 'PLANNED', ?, ?, ?)",
    )
    .bind(id)
    .bind(assignee_id)
    .bind(work_date)
    .bind(&data.title)
    .bind(&data.description)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create task".into()))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: &WorkTaskUpdate,
    now: i64,
) -> RepoResult<WorkTask> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Task {} not found", id)))?;

    sqlx::query(
        "UPDATE work_task SET title = ?, description = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(data.title.clone().unwrap_or(existing.title))
    .bind(data.description.clone().or(existing.description))
    .bind(data.status.unwrap_or(existing.status))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Task {} not found", id)))
}

/// Delete a task and (via FK cascade) its sub-tasks.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM work_task WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Sub-tasks ───────────────────────────────────────────────────────

pub async fn find_sub_task(pool: &SqlitePool, id: i64) -> RepoResult<Option<SubTask>> {
    let sql = format!("SELECT {SUB_COLUMNS} FROM sub_task WHERE id = ?");
    let sub = sqlx::query_as::<_, SubTask>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(sub)
}

pub async fn find_sub_tasks(pool: &SqlitePool, task_id: i64) -> RepoResult<Vec<SubTask>> {
    let sql = format!("SELECT {SUB_COLUMNS} FROM sub_task WHERE task_id = ? ORDER BY created_at ASC");
    let subs = sqlx::query_as::<_, SubTask>(&sql)
        .bind(task_id)
        .fetch_all(pool)
        .await?;
    Ok(subs)
}

pub async fn create_sub_task(
    pool: &SqlitePool,
    task_id: i64,
    data: &SubTaskCreate,
    now: i64,
) -> RepoResult<SubTask> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO sub_task (id, task_id, title, status, created_at, updated_at) \
         VALUES (?, ?, ?, 'PLANNED', ?, ?)",
    )
    .bind(id)
    .bind(task_id)
    .bind(&data.title)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_sub_task(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create sub-task".into()))
}

pub async fn update_sub_task(
    pool: &SqlitePool,
    id: i64,
    data: &SubTaskUpdate,
    now: i64,
) -> RepoResult<SubTask> {
    let existing = find_sub_task(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Sub-task {} not found", id)))?;

    sqlx::query("UPDATE sub_task SET title = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(data.title.clone().unwrap_or(existing.title))
        .bind(data.status.unwrap_or(existing.status))
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    find_sub_task(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Sub-task {} not found", id)))
}

pub async fn delete_sub_task(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM sub_task WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
