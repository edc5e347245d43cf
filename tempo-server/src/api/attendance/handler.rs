//! Attendance API Handlers
//!
//! 打卡接口在考勤门禁豁免名单里——没打卡的人必须还能打卡。

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::attendance;
use crate::utils::time;
use crate::utils::{AppError, AppResult};
use shared::models::{AttendanceRecord, ClockPayload, Role};

const RESOURCE: &str = "attendance";

fn validate_geo(geo: &ClockPayload) -> AppResult<()> {
    if let Some(lat) = geo.lat
        && !(-90.0..=90.0).contains(&lat)
    {
        return Err(AppError::validation(format!("latitude out of range: {lat}")));
    }
    if let Some(lng) = geo.lng
        && !(-180.0..=180.0).contains(&lng)
    {
        return Err(AppError::validation(format!("longitude out of range: {lng}")));
    }
    Ok(())
}

/// POST /api/attendance/clock-in - 上班打卡（当天首次创建记录）
pub async fn clock_in(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ClockPayload>,
) -> AppResult<Json<AttendanceRecord>> {
    validate_geo(&payload)?;

    let today = time::daily_period_key(state.clock.today(state.config.timezone));
    let record = attendance::clock_in(
        &state.pool,
        user.id,
        &today,
        &payload,
        state.clock.now_millis(),
    )
    .await?;

    let id = record.id.to_string();
    state
        .broadcast_sync(RESOURCE, "clocked_in", &id, Some(&record))
        .await;

    Ok(Json(record))
}

/// POST /api/attendance/clock-out - 下班打卡（填充当天记录）
pub async fn clock_out(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ClockPayload>,
) -> AppResult<Json<AttendanceRecord>> {
    validate_geo(&payload)?;

    let today = time::daily_period_key(state.clock.today(state.config.timezone));
    let record = attendance::clock_out(
        &state.pool,
        user.id,
        &today,
        &payload,
        state.clock.now_millis(),
    )
    .await?;

    let id = record.id.to_string();
    state
        .broadcast_sync(RESOURCE, "clocked_out", &id, Some(&record))
        .await;

    Ok(Json(record))
}

/// GET /api/attendance/today - 今天的打卡记录
pub async fn today(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Option<AttendanceRecord>>> {
    let today = time::daily_period_key(state.clock.today(state.config.timezone));
    let record = attendance::find_by_account_date(&state.pool, user.id, &today).await?;
    Ok(Json(record))
}

/// Query params for listing attendance
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub start_date: String,
    pub end_date: String,
    /// 仅主管及以上可以查看他人
    pub account_id: Option<i64>,
}

/// GET /api/attendance - 区间内的打卡记录
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<AttendanceRecord>>> {
    time::parse_date(&query.start_date)?;
    time::parse_date(&query.end_date)?;

    let target = match query.account_id {
        Some(other) if other != user.id => {
            if !user.has_role(Role::Supervisor) {
                return Err(AppError::forbidden(
                    "Requires SUPERVISOR role to view other accounts",
                ));
            }
            other
        }
        _ => user.id,
    };

    let records = attendance::find_by_account_range(
        &state.pool,
        target,
        &query.start_date,
        &query.end_date,
    )
    .await?;
    Ok(Json(records))
}
