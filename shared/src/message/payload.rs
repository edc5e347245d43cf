//! Bus message payloads

use serde::{Deserialize, Serialize};

/// Event kind carried by a [`BusMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Resource changed — clients refresh their view
    Sync,
    /// Inbox notification created for a specific account
    Notify,
    /// All sessions of an account were invalidated
    ForceLogout,
}

/// Resource change notification
///
/// `version` is a per-resource monotonically increasing counter so clients
/// can discard stale updates delivered out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Resource type ("work_task", "report", "extension", ...)
    pub resource: String,
    /// Per-resource version counter
    pub version: u64,
    /// Change kind ("created", "updated", "deleted", "status_changed", ...)
    pub action: String,
    /// Resource ID
    pub id: String,
    /// Resource data (None for deletions)
    pub data: Option<serde_json::Value>,
}

/// A single broadcast frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub event: EventType,
    pub payload: serde_json::Value,
    /// Unix millis at publish time
    pub timestamp: i64,
}

impl BusMessage {
    /// Resource sync frame
    pub fn sync(payload: &SyncPayload) -> Self {
        Self {
            event: EventType::Sync,
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            timestamp: crate::util::now_millis(),
        }
    }

    /// Forced-logout frame for one account
    pub fn force_logout(account_id: i64) -> Self {
        Self {
            event: EventType::ForceLogout,
            payload: serde_json::json!({ "account_id": account_id }),
            timestamp: crate::util::now_millis(),
        }
    }

    /// Inbox notification frame
    pub fn notify(account_id: i64, kind: &str) -> Self {
        Self {
            event: EventType::Notify,
            payload: serde_json::json!({ "account_id": account_id, "kind": kind }),
            timestamp: crate::util::now_millis(),
        }
    }
}
