//! Attendance Model (考勤记录)

use serde::{Deserialize, Serialize};

/// Attendance record — one row per (account, calendar date)
///
/// Created by the first clock-in of the day; clock-out fills the same row.
/// The UNIQUE(account_id, work_date) index is the only concurrency guard
/// against duplicate creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AttendanceRecord {
    pub id: i64,
    pub account_id: i64,
    /// Calendar date in the organizational timezone (YYYY-MM-DD)
    pub work_date: String,
    /// Unix millis
    pub clock_in_at: Option<i64>,
    pub clock_out_at: Option<i64>,
    pub clock_in_lat: Option<f64>,
    pub clock_in_lng: Option<f64>,
    pub clock_out_lat: Option<f64>,
    pub clock_out_lng: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AttendanceRecord {
    pub fn is_clocked_in(&self) -> bool {
        self.clock_in_at.is_some()
    }

    pub fn is_clocked_out(&self) -> bool {
        self.clock_out_at.is_some()
    }
}

/// Clock-in / clock-out payload (geolocation optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockPayload {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}
