//! Department Repository

use super::{RepoError, RepoResult};
use shared::models::{Department, DepartmentReport, PeriodType};
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, is_active, created_at, updated_at";
const REPORT_COLUMNS: &str =
    "id, department_id, period_type, period_key, summary, status, generated_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Department>> {
    let sql = format!("SELECT {COLUMNS} FROM department WHERE id = ?");
    let dept = sqlx::query_as::<_, Department>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(dept)
}

pub async fn find_active(pool: &SqlitePool) -> RepoResult<Vec<Department>> {
    let sql = format!("SELECT {COLUMNS} FROM department WHERE is_active = 1 ORDER BY name");
    let depts = sqlx::query_as::<_, Department>(&sql).fetch_all(pool).await?;
    Ok(depts)
}

pub async fn create(pool: &SqlitePool, name: &str, now: i64) -> RepoResult<Department> {
    let id = snowflake_id();
    sqlx::query("INSERT INTO department (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create department".into()))
}

// ── Department reports (derived rollups) ────────────────────────────

pub async fn find_report(
    pool: &SqlitePool,
    department_id: i64,
    period_type: PeriodType,
    period_key: &str,
) -> RepoResult<Option<DepartmentReport>> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM department_report \
         WHERE department_id = ? AND period_type = ? AND period_key = ?"
    );
    let report = sqlx::query_as::<_, DepartmentReport>(&sql)
        .bind(department_id)
        .bind(period_type)
        .bind(period_key)
        .fetch_optional(pool)
        .await?;
    Ok(report)
}

pub async fn list_reports(
    pool: &SqlitePool,
    department_id: i64,
    period_type: Option<PeriodType>,
    limit: i32,
) -> RepoResult<Vec<DepartmentReport>> {
    let reports = match period_type {
        Some(pt) => {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM department_report \
                 WHERE department_id = ? AND period_type = ? \
                 ORDER BY generated_at DESC LIMIT ?"
            );
            sqlx::query_as::<_, DepartmentReport>(&sql)
                .bind(department_id)
                .bind(pt)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM department_report WHERE department_id = ? \
                 ORDER BY generated_at DESC LIMIT ?"
            );
            sqlx::query_as::<_, DepartmentReport>(&sql)
                .bind(department_id)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(reports)
}

/// Idempotent upsert keyed on (department, period_type, period_key):
/// regenerating replaces summary and updated_at in place, never duplicates.
pub async fn upsert_report(
    pool: &SqlitePool,
    department_id: i64,
    period_type: PeriodType,
    period_key: &str,
    summary: &str,
    now: i64,
) -> RepoResult<DepartmentReport> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO department_report \
         (id, department_id, period_type, period_key, summary, status, generated_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'SUBMITTED', ?, ?) \
         ON CONFLICT(department_id, period_type, period_key) \
         DO UPDATE SET summary = excluded.summary, updated_at = excluded.updated_at",
    )
    .bind(id)
    .bind(department_id)
    .bind(period_type)
    .bind(period_key)
    .bind(summary)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_report(pool, department_id, period_type, period_key)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to upsert department report".into()))
}
