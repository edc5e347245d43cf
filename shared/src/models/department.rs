//! Department Model (部门)

use serde::{Deserialize, Serialize};

use super::{PeriodType, ReportStatus};

/// Department entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Derived departmental rollup, unique per (department, period_type,
/// period_key).
///
/// Regenerating for the same period replaces the summary in place
/// (idempotent upsert) instead of duplicating the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DepartmentReport {
    pub id: i64,
    pub department_id: i64,
    pub period_type: PeriodType,
    pub period_key: String,
    /// Concatenated member summaries, one labeled block per author
    pub summary: String,
    pub status: ReportStatus,
    pub generated_at: i64,
    pub updated_at: i64,
}
