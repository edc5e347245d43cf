//! Report Model (工作报告)
//!
//! One entity for all three report granularities. The period shape lives in
//! (`period_type`, `period_key`):
//!
//! | period_type | period_key              |
//! |-------------|-------------------------|
//! | DAILY       | `2026-08-07`            |
//! | WEEKLY      | `2026-08-03_2026-08-09` |
//! | MONTHLY     | `2026-08`               |

use serde::{Deserialize, Serialize};

use super::Role;

/// Report granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a report.
///
/// ```text
/// DRAFT → SUBMITTED → REVIEWED → HEAD_REVIEWED → APPROVED
///                  ↘──────────↘──────────────↘ REJECTED
/// ```
///
/// REJECTED is reachable from SUBMITTED, REVIEWED and HEAD_REVIEWED and is
/// terminal, as is APPROVED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Reviewed,
    HeadReviewed,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Reviewed => "REVIEWED",
            Self::HeadReviewed => "HEAD_REVIEWED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "SUBMITTED" => Some(Self::Submitted),
            "REVIEWED" => Some(Self::Reviewed),
            "HEAD_REVIEWED" => Some(Self::HeadReviewed),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether the report has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Statuses at or past SUBMITTED freeze the day's tasks.
    pub fn locks_tasks(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Reviewed | Self::HeadReviewed | Self::Approved
        )
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report entity, unique per (account, period_type, period_key)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Report {
    pub id: i64,
    pub account_id: i64,
    /// Snapshot of the author's department at creation time
    pub department_id: Option<i64>,
    pub period_type: PeriodType,
    pub period_key: String,
    /// Report body — what was accomplished in the period
    pub content: String,
    pub status: ReportStatus,
    /// Signature artifact references, one per advancing stage
    pub employee_signature: Option<String>,
    pub supervisor_signature: Option<String>,
    pub head_signature: Option<String>,
    pub manager_signature: Option<String>,
    /// Optional reviewer comments, one per stage
    pub supervisor_comment: Option<String>,
    pub head_comment: Option<String>,
    pub manager_comment: Option<String>,
    /// Set when the report is rejected
    pub rejected_by: Option<i64>,
    pub rejection_comment: Option<String>,
    pub submitted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create report payload
///
/// With a signature present the report is created directly as SUBMITTED
/// (manual same-day submission); without one it is a DRAFT (automation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCreate {
    pub period_type: PeriodType,
    pub period_key: String,
    pub content: String,
    pub signature: Option<String>,
}

/// Advancing transition payload — signature mandatory, comment optional
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionPayload {
    pub signature: String,
    pub comment: Option<String>,
}

/// Reject payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectPayload {
    pub comment: Option<String>,
}

/// Management-authored reports skip the supervisor review tier: their
/// SUBMITTED reports go straight into the final-action queue and may be
/// head-reviewed directly from SUBMITTED.
///
/// This is the explicit, named form of a rule the review queues would
/// otherwise have to re-derive from a join condition.
pub fn skips_supervisor_tier(owner_role: Role) -> bool {
    owner_role.is_management()
}
