//! Account Repository

use super::{RepoError, RepoResult};
use shared::models::{Account, AccountCreate, AccountUpdate, SecuritySettings};
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, email, display_name, hash_pass, role, department_id, \
    failed_attempts, locked, lock_expires_at, is_online, last_active_at, last_login_at, \
    month_end_day, is_active, security, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Account>> {
    let sql = format!("SELECT {COLUMNS} FROM account WHERE id = ?");
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<Account>> {
    let sql = format!("SELECT {COLUMNS} FROM account WHERE email = ?");
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Account>> {
    let sql = format!("SELECT {COLUMNS} FROM account ORDER BY display_name");
    let accounts = sqlx::query_as::<_, Account>(&sql).fetch_all(pool).await?;
    Ok(accounts)
}

pub async fn find_active(pool: &SqlitePool) -> RepoResult<Vec<Account>> {
    let sql = format!("SELECT {COLUMNS} FROM account WHERE is_active = 1 ORDER BY display_name");
    let accounts = sqlx::query_as::<_, Account>(&sql).fetch_all(pool).await?;
    Ok(accounts)
}

pub async fn find_by_department(
    pool: &SqlitePool,
    department_id: i64,
) -> RepoResult<Vec<Account>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM account WHERE department_id = ? AND is_active = 1 \
         ORDER BY display_name"
    );
    let accounts = sqlx::query_as::<_, Account>(&sql)
        .bind(department_id)
        .fetch_all(pool)
        .await?;
    Ok(accounts)
}

pub async fn create(
    pool: &SqlitePool,
    data: AccountCreate,
    hash_pass: String,
    now: i64,
) -> RepoResult<Account> {
    if find_by_email(pool, &data.email).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Email '{}' already registered",
            data.email
        )));
    }

    let id = snowflake_id();
    let display_name = data.display_name.unwrap_or_else(|| data.email.clone());
    let security = serde_json::to_string(&SecuritySettings::default())
        .map_err(|e| RepoError::Database(e.to_string()))?;

    sqlx::query(
        "INSERT INTO account (id, email, display_name, hash_pass, role, department_id, \
         month_end_day, security, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.email)
    .bind(&display_name)
    .bind(&hash_pass)
    .bind(data.role)
    .bind(data.department_id)
    .bind(data.month_end_day.unwrap_or(25))
    .bind(&security)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create account".into()))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: AccountUpdate,
    hash_pass: Option<String>,
    now: i64,
) -> RepoResult<Account> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Account {} not found", id)))?;

    sqlx::query(
        "UPDATE account SET display_name = ?, hash_pass = ?, role = ?, department_id = ?, \
         month_end_day = ?, is_active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(data.display_name.unwrap_or(existing.display_name))
    .bind(hash_pass.unwrap_or(existing.hash_pass))
    .bind(data.role.unwrap_or(existing.role))
    .bind(data.department_id.or(existing.department_id))
    .bind(data.month_end_day.unwrap_or(existing.month_end_day))
    .bind(data.is_active.unwrap_or(existing.is_active))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Account {} not found", id)))
}

/// Record one failed password attempt and return the new counter value.
pub async fn record_failed_attempt(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<i64> {
    sqlx::query("UPDATE account SET failed_attempts = failed_attempts + 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    let attempts: i64 =
        sqlx::query_scalar("SELECT failed_attempts FROM account WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(attempts)
}

/// Lock the account. `expires_at = None` locks indefinitely (admin lock).
pub async fn set_lock(
    pool: &SqlitePool,
    id: i64,
    expires_at: Option<i64>,
    now: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE account SET locked = 1, lock_expires_at = ?, updated_at = ? WHERE id = ?")
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Clear lock state and the failure counter (lazy unlock, admin unlock).
pub async fn clear_lock(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<()> {
    sqlx::query(
        "UPDATE account SET locked = 0, lock_expires_at = NULL, failed_attempts = 0, \
         updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Full-success bookkeeping: counter reset, lock cleared, login stamped.
pub async fn mark_login_success(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<()> {
    sqlx::query(
        "UPDATE account SET failed_attempts = 0, locked = 0, lock_expires_at = NULL, \
         last_login_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Presence flag — only the presence service calls this.
pub async fn set_presence(pool: &SqlitePool, id: i64, online: bool, now: i64) -> RepoResult<()> {
    sqlx::query("UPDATE account SET is_online = ?, last_active_at = ?, updated_at = ? WHERE id = ?")
        .bind(online)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the security settings blob (already merged by the caller).
pub async fn update_security(
    pool: &SqlitePool,
    id: i64,
    security: &SecuritySettings,
    now: i64,
) -> RepoResult<()> {
    let blob = serde_json::to_string(security).map_err(|e| RepoError::Database(e.to_string()))?;
    sqlx::query("UPDATE account SET security = ?, updated_at = ? WHERE id = ?")
        .bind(&blob)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_password(
    pool: &SqlitePool,
    id: i64,
    hash_pass: String,
    now: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE account SET hash_pass = ?, updated_at = ? WHERE id = ?")
        .bind(&hash_pass)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
