//! Password Reset Repository
//!
//! Stores only SHA-256 hashes of single-use reset tokens; the plaintext
//! token leaves the server exactly once, through the mail collaborator.

use super::RepoResult;
use shared::snowflake_id;
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: i64,
    pub account_id: i64,
    pub token_hash: String,
    pub expires_at: i64,
    pub used: bool,
    pub created_at: i64,
}

pub async fn create(
    pool: &SqlitePool,
    account_id: i64,
    token_hash: &str,
    expires_at: i64,
    now: i64,
) -> RepoResult<()> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO password_reset (id, account_id, token_hash, expires_at, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Unused, unexpired reset entry for the given token hash.
pub async fn find_valid(
    pool: &SqlitePool,
    token_hash: &str,
    now: i64,
) -> RepoResult<Option<PasswordReset>> {
    let reset = sqlx::query_as::<_, PasswordReset>(
        "SELECT id, account_id, token_hash, expires_at, used, created_at \
         FROM password_reset WHERE token_hash = ? AND used = 0 AND expires_at > ?",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(reset)
}

/// Single use: consuming requires `used = 0`, so a replay affects zero rows.
pub async fn consume(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let result = sqlx::query("UPDATE password_reset SET used = 1 WHERE id = ? AND used = 0")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
