//! Time Extension Repository

use super::{RepoError, RepoResult};
use shared::models::{ExtensionCreate, ExtensionStatus, TimeExtension};
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str =
    "id, account_id, work_date, extended_until, reason, status, decided_by, decided_at, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<TimeExtension>> {
    let sql = format!("SELECT {COLUMNS} FROM time_extension WHERE id = ?");
    let ext = sqlx::query_as::<_, TimeExtension>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(ext)
}

/// The approved extension for (account, date) with the latest allowed-until,
/// if any. This is what the access decision consults after clock-out.
pub async fn find_approved(
    pool: &SqlitePool,
    account_id: i64,
    work_date: &str,
) -> RepoResult<Option<TimeExtension>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM time_extension \
         WHERE account_id = ? AND work_date = ? AND status = 'APPROVED' \
         ORDER BY extended_until DESC LIMIT 1"
    );
    let ext = sqlx::query_as::<_, TimeExtension>(&sql)
        .bind(account_id)
        .bind(work_date)
        .fetch_optional(pool)
        .await?;
    Ok(ext)
}

pub async fn find_by_account(
    pool: &SqlitePool,
    account_id: i64,
    limit: i32,
) -> RepoResult<Vec<TimeExtension>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM time_extension WHERE account_id = ? \
         ORDER BY created_at DESC LIMIT ?"
    );
    let exts = sqlx::query_as::<_, TimeExtension>(&sql)
        .bind(account_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(exts)
}

pub async fn find_pending(pool: &SqlitePool) -> RepoResult<Vec<TimeExtension>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM time_extension WHERE status = 'PENDING' ORDER BY created_at ASC"
    );
    let exts = sqlx::query_as::<_, TimeExtension>(&sql).fetch_all(pool).await?;
    Ok(exts)
}

pub async fn create(
    pool: &SqlitePool,
    account_id: i64,
    work_date: &str,
    data: &ExtensionCreate,
    now: i64,
) -> RepoResult<TimeExtension> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO time_extension \
         (id, account_id, work_date, extended_until, reason, status, created_at) \
         VALUES (?, ?, ?, ?, ?, 'PENDING', ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(work_date)
    .bind(data.extended_until)
    .bind(&data.reason)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create time extension".into()))
}

/// Decide a pending extension exactly once. The `status = 'PENDING'`
/// precondition makes a second decision a conflict instead of an overwrite.
pub async fn decide(
    pool: &SqlitePool,
    id: i64,
    status: ExtensionStatus,
    decided_by: i64,
    now: i64,
) -> RepoResult<TimeExtension> {
    if !status.is_terminal() {
        return Err(RepoError::Validation(
            "Extension decision must be APPROVED or REJECTED".into(),
        ));
    }

    let result = sqlx::query(
        "UPDATE time_extension SET status = ?, decided_by = ?, decided_at = ? \
         WHERE id = ? AND status = 'PENDING'",
    )
    .bind(status)
    .bind(decided_by)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match find_by_id(pool, id).await? {
            Some(ext) => Err(RepoError::Conflict(format!(
                "Extension already decided: {}",
                ext.status
            ))),
            None => Err(RepoError::NotFound(format!("Extension {} not found", id))),
        };
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Extension vanished after decision".into()))
}
