//! Report Repository
//!
//! Every status transition is a single `UPDATE ... WHERE id = ? AND
//! status = ?` — the expected-current-status precondition turns a lost race
//! into zero affected rows instead of a silent overwrite. Callers treat
//! zero rows as a transition conflict.

use super::{RepoError, RepoResult};
use shared::models::{PeriodType, Report, ReportCreate, ReportStatus};
use shared::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, account_id, department_id, period_type, period_key, content, status, \
    employee_signature, supervisor_signature, head_signature, manager_signature, \
    supervisor_comment, head_comment, manager_comment, rejected_by, rejection_comment, \
    submitted_at, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Report>> {
    let sql = format!("SELECT {COLUMNS} FROM report WHERE id = ?");
    let report = sqlx::query_as::<_, Report>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(report)
}

pub async fn find_by_account_period(
    pool: &SqlitePool,
    account_id: i64,
    period_type: PeriodType,
    period_key: &str,
) -> RepoResult<Option<Report>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM report \
         WHERE account_id = ? AND period_type = ? AND period_key = ?"
    );
    let report = sqlx::query_as::<_, Report>(&sql)
        .bind(account_id)
        .bind(period_type)
        .bind(period_key)
        .fetch_optional(pool)
        .await?;
    Ok(report)
}

pub async fn find_by_account(
    pool: &SqlitePool,
    account_id: i64,
    period_type: Option<PeriodType>,
    limit: i32,
) -> RepoResult<Vec<Report>> {
    let reports = match period_type {
        Some(pt) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM report WHERE account_id = ? AND period_type = ? \
                 ORDER BY created_at DESC LIMIT ?"
            );
            sqlx::query_as::<_, Report>(&sql)
                .bind(account_id)
                .bind(pt)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {COLUMNS} FROM report WHERE account_id = ? \
                 ORDER BY created_at DESC LIMIT ?"
            );
            sqlx::query_as::<_, Report>(&sql)
                .bind(account_id)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(reports)
}

/// Supervisor review queue: SUBMITTED reports by non-management authors.
pub async fn supervisor_queue(pool: &SqlitePool) -> RepoResult<Vec<Report>> {
    let sql = format!(
        "SELECT r.{} FROM report r JOIN account a ON a.id = r.account_id \
         WHERE r.status = 'SUBMITTED' AND a.role NOT IN ('MANAGER', 'ADMINISTRATOR') \
         ORDER BY r.submitted_at ASC",
        COLUMNS.replace(", ", ", r.")
    );
    let reports = sqlx::query_as::<_, Report>(&sql).fetch_all(pool).await?;
    Ok(reports)
}

/// Department-head queue: REVIEWED reports, plus SUBMITTED reports whose
/// authors skip the supervisor tier (SQL form of
/// [`shared::models::report::skips_supervisor_tier`]).
pub async fn head_queue(pool: &SqlitePool) -> RepoResult<Vec<Report>> {
    let sql = format!(
        "SELECT r.{} FROM report r JOIN account a ON a.id = r.account_id \
         WHERE r.status = 'REVIEWED' \
            OR (r.status = 'SUBMITTED' AND a.role IN ('MANAGER', 'ADMINISTRATOR')) \
         ORDER BY r.submitted_at ASC",
        COLUMNS.replace(", ", ", r.")
    );
    let reports = sqlx::query_as::<_, Report>(&sql).fetch_all(pool).await?;
    Ok(reports)
}

/// Manager final-action queue: everything ready for final sign-off.
pub async fn manager_queue(pool: &SqlitePool) -> RepoResult<Vec<Report>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM report \
         WHERE status IN ('REVIEWED', 'HEAD_REVIEWED') \
         ORDER BY submitted_at ASC"
    );
    let reports = sqlx::query_as::<_, Report>(&sql).fetch_all(pool).await?;
    Ok(reports)
}

/// Create a report. With a signature it is born SUBMITTED (manual same-day
/// submission), without one it is a DRAFT (automation).
pub async fn create(
    pool: &SqlitePool,
    account_id: i64,
    department_id: Option<i64>,
    data: &ReportCreate,
    now: i64,
) -> RepoResult<Report> {
    let id = snowflake_id();
    let (status, submitted_at) = match &data.signature {
        Some(_) => (ReportStatus::Submitted, Some(now)),
        None => (ReportStatus::Draft, None),
    };

    let result = sqlx::query(
        "INSERT INTO report (id, account_id, department_id, period_type, period_key, content, \
         status, employee_signature, submitted_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(department_id)
    .bind(data.period_type)
    .bind(&data.period_key)
    .bind(&data.content)
    .bind(status)
    .bind(&data.signature)
    .bind(submitted_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => find_by_id(pool, id)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create report".into())),
        Err(e) => match RepoError::from(e) {
            RepoError::Duplicate(_) => Err(RepoError::Duplicate(format!(
                "A {} report for {} already exists",
                data.period_type, data.period_key
            ))),
            other => Err(other),
        },
    }
}

/// DRAFT → SUBMITTED
pub async fn mark_submitted(
    pool: &SqlitePool,
    id: i64,
    signature: &str,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE report SET status = 'SUBMITTED', employee_signature = ?, submitted_at = ?, \
         updated_at = ? WHERE id = ? AND status = 'DRAFT'",
    )
    .bind(signature)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// SUBMITTED → REVIEWED (supervisor tier)
pub async fn mark_reviewed(
    pool: &SqlitePool,
    id: i64,
    signature: &str,
    comment: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE report SET status = 'REVIEWED', supervisor_signature = ?, \
         supervisor_comment = ?, updated_at = ? WHERE id = ? AND status = 'SUBMITTED'",
    )
    .bind(signature)
    .bind(comment)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// {REVIEWED | SUBMITTED-by-management} → HEAD_REVIEWED (head tier).
/// The engine validates `expected` against the skip policy before calling.
pub async fn mark_head_reviewed(
    pool: &SqlitePool,
    id: i64,
    expected: ReportStatus,
    signature: &str,
    comment: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE report SET status = 'HEAD_REVIEWED', head_signature = ?, head_comment = ?, \
         updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(signature)
    .bind(comment)
    .bind(now)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// {REVIEWED | HEAD_REVIEWED} → APPROVED (manager tier)
pub async fn mark_approved(
    pool: &SqlitePool,
    id: i64,
    expected: ReportStatus,
    signature: &str,
    comment: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE report SET status = 'APPROVED', manager_signature = ?, manager_comment = ?, \
         updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(signature)
    .bind(comment)
    .bind(now)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// {SUBMITTED | REVIEWED | HEAD_REVIEWED} → REJECTED (terminal)
pub async fn mark_rejected(
    pool: &SqlitePool,
    id: i64,
    expected: ReportStatus,
    rejected_by: i64,
    comment: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE report SET status = 'REJECTED', rejected_by = ?, rejection_comment = ?, \
         updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(rejected_by)
    .bind(comment)
    .bind(now)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Daily reports of one account in a period_key range (keys sort
/// lexicographically as dates), oldest first. Feeds weekly/monthly drafts.
pub async fn find_daily_in_key_range(
    pool: &SqlitePool,
    account_id: i64,
    from_key: &str,
    to_key: &str,
) -> RepoResult<Vec<Report>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM report \
         WHERE account_id = ? AND period_type = 'DAILY' \
         AND period_key >= ? AND period_key <= ? \
         AND status != 'REJECTED' \
         ORDER BY period_key ASC"
    );
    let reports = sqlx::query_as::<_, Report>(&sql)
        .bind(account_id)
        .bind(from_key)
        .bind(to_key)
        .fetch_all(pool)
        .await?;
    Ok(reports)
}

/// Whether a daily report at or past SUBMITTED exists for (assignee, date) —
/// the task-lock predicate.
pub async fn daily_lock_exists(
    pool: &SqlitePool,
    account_id: i64,
    work_date: &str,
) -> RepoResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM report \
         WHERE account_id = ? AND period_type = 'DAILY' AND period_key = ? \
         AND status IN ('SUBMITTED', 'REVIEWED', 'HEAD_REVIEWED', 'APPROVED')",
    )
    .bind(account_id)
    .bind(work_date)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// One member report row feeding a departmental rollup.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberReport {
    pub account_id: i64,
    pub display_name: String,
    pub content: String,
}

/// Member reports of a department qualifying for a rollup. The qualifying
/// status set differs per period type and is supplied by the aggregator.
pub async fn find_qualifying_for_rollup(
    pool: &SqlitePool,
    department_id: i64,
    period_type: PeriodType,
    period_key: &str,
    statuses: &[ReportStatus],
) -> RepoResult<Vec<MemberReport>> {
    let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT r.account_id, a.display_name, r.content \
         FROM report r JOIN account a ON a.id = r.account_id \
         WHERE a.department_id = ? AND r.period_type = ? AND r.period_key = ? \
         AND r.status IN ({placeholders}) \
         ORDER BY a.display_name, r.account_id"
    );

    let mut query = sqlx::query_as::<_, MemberReport>(&sql)
        .bind(department_id)
        .bind(period_type)
        .bind(period_key);
    for status in statuses {
        query = query.bind(*status);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}
