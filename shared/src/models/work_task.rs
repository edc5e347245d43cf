//! Work Task Model (工作任务)

use serde::{Deserialize, Serialize};

/// Task completion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Planned,
    Done,
    NotDone,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Done => "DONE",
            Self::NotDone => "NOT_DONE",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task assigned to one account for one calendar date.
///
/// Once a daily report for (assignee, date) reaches SUBMITTED or beyond the
/// task and its sub-tasks become immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WorkTask {
    pub id: i64,
    pub assignee_id: i64,
    /// Calendar date (YYYY-MM-DD)
    pub work_date: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Sub-task belonging to one task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SubTask {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create task payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTaskCreate {
    /// Assignee account; defaults to the caller
    pub assignee_id: Option<i64>,
    /// Calendar date (YYYY-MM-DD); defaults to today
    pub work_date: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

/// Update task payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkTaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

/// Create sub-task payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskCreate {
    pub title: String,
}

/// Update sub-task payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubTaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}
