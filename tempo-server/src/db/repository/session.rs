//! Session Repository

use super::RepoResult;
use shared::models::Session;
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, account_id, is_active, created_at, expires_at, ip, user_agent";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Session>> {
    let sql = format!("SELECT {COLUMNS} FROM session WHERE id = ?");
    let session = sqlx::query_as::<_, Session>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(session)
}

/// Active, non-expired sessions for one account, oldest first.
pub async fn find_active(
    pool: &SqlitePool,
    account_id: i64,
    now: i64,
) -> RepoResult<Vec<Session>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM session \
         WHERE account_id = ? AND is_active = 1 AND expires_at > ? \
         ORDER BY created_at ASC, id ASC"
    );
    let sessions = sqlx::query_as::<_, Session>(&sql)
        .bind(account_id)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(sessions)
}

pub async fn create(
    pool: &SqlitePool,
    account_id: i64,
    now: i64,
    expires_at: i64,
    ip: Option<String>,
    user_agent: Option<String>,
) -> RepoResult<Session> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO session (id, account_id, is_active, created_at, expires_at, ip, user_agent) \
         VALUES (?, ?, 1, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(now)
    .bind(expires_at)
    .bind(&ip)
    .bind(&user_agent)
    .execute(pool)
    .await?;

    Ok(Session {
        id,
        account_id,
        is_active: true,
        created_at: now,
        expires_at,
        ip,
        user_agent,
    })
}

pub async fn deactivate(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let result = sqlx::query("UPDATE session SET is_active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Deactivate every session of an account (forced logout).
pub async fn deactivate_all(pool: &SqlitePool, account_id: i64) -> RepoResult<u64> {
    let result = sqlx::query("UPDATE session SET is_active = 0 WHERE account_id = ? AND is_active = 1")
        .bind(account_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
