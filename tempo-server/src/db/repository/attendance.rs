//! Attendance Repository
//!
//! One row per (account, work_date); the UNIQUE index is the concurrency
//! guard against duplicate creation.

use super::{RepoError, RepoResult};
use shared::models::{AttendanceRecord, ClockPayload};
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, account_id, work_date, clock_in_at, clock_out_at, \
    clock_in_lat, clock_in_lng, clock_out_lat, clock_out_lng, created_at, updated_at";

pub async fn find_by_account_date(
    pool: &SqlitePool,
    account_id: i64,
    work_date: &str,
) -> RepoResult<Option<AttendanceRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM attendance_record WHERE account_id = ? AND work_date = ?");
    let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(account_id)
        .bind(work_date)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

pub async fn find_by_date(pool: &SqlitePool, work_date: &str) -> RepoResult<Vec<AttendanceRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM attendance_record WHERE work_date = ? ORDER BY clock_in_at");
    let records = sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(work_date)
        .fetch_all(pool)
        .await?;
    Ok(records)
}

pub async fn find_by_account_range(
    pool: &SqlitePool,
    account_id: i64,
    start_date: &str,
    end_date: &str,
) -> RepoResult<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM attendance_record \
         WHERE account_id = ? AND work_date >= ? AND work_date <= ? \
         ORDER BY work_date DESC"
    );
    let records = sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(account_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;
    Ok(records)
}

/// First clock-in of the day creates the row; a second clock-in the same day
/// is a conflict (surfaced by the UNIQUE index, not a pre-read).
pub async fn clock_in(
    pool: &SqlitePool,
    account_id: i64,
    work_date: &str,
    geo: &ClockPayload,
    now: i64,
) -> RepoResult<AttendanceRecord> {
    let id = snowflake_id();
    let result = sqlx::query(
        "INSERT INTO attendance_record \
         (id, account_id, work_date, clock_in_at, clock_in_lat, clock_in_lng, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(work_date)
    .bind(now)
    .bind(geo.lat)
    .bind(geo.lng)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => find_by_account_date(pool, account_id, work_date)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create attendance record".into())),
        Err(e) => match RepoError::from(e) {
            RepoError::Duplicate(_) => Err(RepoError::Duplicate(format!(
                "Already clocked in on {}",
                work_date
            ))),
            other => Err(other),
        },
    }
}

/// Clock-out fills the existing row; requires a prior clock-in and rejects a
/// second clock-out.
pub async fn clock_out(
    pool: &SqlitePool,
    account_id: i64,
    work_date: &str,
    geo: &ClockPayload,
    now: i64,
) -> RepoResult<AttendanceRecord> {
    let existing = find_by_account_date(pool, account_id, work_date)
        .await?
        .ok_or_else(|| RepoError::Validation(format!("Not clocked in on {}", work_date)))?;

    if existing.clock_out_at.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Already clocked out on {}",
            work_date
        )));
    }

    sqlx::query(
        "UPDATE attendance_record \
         SET clock_out_at = ?, clock_out_lat = ?, clock_out_lng = ?, updated_at = ? \
         WHERE id = ? AND clock_out_at IS NULL",
    )
    .bind(now)
    .bind(geo.lat)
    .bind(geo.lng)
    .bind(now)
    .bind(existing.id)
    .execute(pool)
    .await?;

    find_by_account_date(pool, account_id, work_date)
        .await?
        .ok_or_else(|| RepoError::Database("Attendance record vanished".into()))
}
