//! Notification Repository

use super::{RepoError, RepoResult};
use shared::models::{Notification, NotificationKind};
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, account_id, kind, title, body, is_read, created_at";

pub async fn find_by_account(
    pool: &SqlitePool,
    account_id: i64,
    unread_only: bool,
    limit: i32,
) -> RepoResult<Vec<Notification>> {
    let notifications = if unread_only {
        let sql = format!(
            "SELECT {COLUMNS} FROM notification WHERE account_id = ? AND is_read = 0 \
             ORDER BY created_at DESC LIMIT ?"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(account_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
    } else {
        let sql = format!(
            "SELECT {COLUMNS} FROM notification WHERE account_id = ? \
             ORDER BY created_at DESC LIMIT ?"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(account_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
    };
    Ok(notifications)
}

pub async fn create(
    pool: &SqlitePool,
    account_id: i64,
    kind: NotificationKind,
    title: &str,
    body: &str,
    now: i64,
) -> RepoResult<Notification> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO notification (id, account_id, kind, title, body, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(now)
    .execute(pool)
    .await?;

    let sql = format!("SELECT {COLUMNS} FROM notification WHERE id = ?");
    sqlx::query_as::<_, Notification>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create notification".into()))
}

pub async fn mark_read(pool: &SqlitePool, id: i64, account_id: i64) -> RepoResult<bool> {
    let result = sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ? AND account_id = ?")
        .bind(id)
        .bind(account_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
