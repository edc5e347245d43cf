//! Task Lock Propagator
//!
//! Once a daily report for (assignee, date) reaches SUBMITTED or beyond,
//! the day's tasks and sub-tasks are frozen: every mutating operation is
//! rejected, reads are unaffected. The historical record of what was signed
//! off must not drift afterwards.

use sqlx::SqlitePool;

use crate::db::repository::report;
use crate::utils::AppError;

/// Whether tasks for (assignee, date) are frozen by a daily report.
pub async fn is_locked(
    pool: &SqlitePool,
    assignee_id: i64,
    work_date: &str,
) -> Result<bool, AppError> {
    Ok(report::daily_lock_exists(pool, assignee_id, work_date).await?)
}

/// Guard consulted before every task/sub-task create/update/delete.
pub async fn ensure_unlocked(
    pool: &SqlitePool,
    assignee_id: i64,
    work_date: &str,
) -> Result<(), AppError> {
    if is_locked(pool, assignee_id, work_date).await? {
        return Err(AppError::resource_locked(
            "report already submitted for this day",
        ));
    }
    Ok(())
}
