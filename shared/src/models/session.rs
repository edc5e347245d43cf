//! Session Model

use serde::{Deserialize, Serialize};

/// One login session
///
/// At most 3 sessions per account may be simultaneously active and
/// non-expired; registering a new one past the cap deactivates the oldest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Session {
    pub id: i64,
    pub account_id: i64,
    pub is_active: bool,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis; past this the session no longer counts as active
    pub expires_at: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Active flag plus expiry check against the given "now"
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        self.is_active && self.expires_at > now_millis
    }
}
