//! Time Extension Model (加班延时)

use serde::{Deserialize, Serialize};

/// Extension decision state
///
/// ```text
/// PENDING → APPROVED
///        → REJECTED
/// ```
///
/// Approved and Rejected are terminal — an extension is decided exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor/manager-approved override permitting access after clock-out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TimeExtension {
    pub id: i64,
    pub account_id: i64,
    /// Calendar date the extension applies to (YYYY-MM-DD)
    pub work_date: String,
    /// Access allowed until this Unix millis
    pub extended_until: i64,
    pub reason: String,
    pub status: ExtensionStatus,
    /// Approver/rejecter account id, set when decided
    pub decided_by: Option<i64>,
    pub decided_at: Option<i64>,
    pub created_at: i64,
}

/// Create extension payload (filed by the employee)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionCreate {
    /// Date the extension applies to (YYYY-MM-DD); defaults to today
    pub work_date: Option<String>,
    /// Requested "allowed-until" Unix millis
    pub extended_until: i64,
    pub reason: String,
}
