//! Department API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::department;
use crate::reports::rollup;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};
use crate::utils::{AppError, AppResult};
use shared::models::{Department, DepartmentReport, PeriodType};

/// GET /api/departments
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Department>>> {
    let depts = department::find_active(&state.pool).await?;
    Ok(Json(depts))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: String,
}

/// POST /api/departments (经理及以上)
pub async fn create(
    State(state): State<ServerState>,
    Json(req): Json<CreateRequest>,
) -> AppResult<Json<Department>> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    let dept = department::create(&state.pool, req.name.trim(), state.clock.now_millis()).await?;
    Ok(Json(dept))
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub period_type: Option<PeriodType>,
    #[serde(default = "default_limit")]
    pub limit: i32,
}

fn default_limit() -> i32 {
    50
}

/// GET /api/departments/:id/reports - 部门汇总列表
pub async fn list_reports(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(query): Query<ReportsQuery>,
) -> AppResult<Json<Vec<DepartmentReport>>> {
    let reports =
        department::list_reports(&state.pool, id, query.period_type, query.limit).await?;
    Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
pub struct RollupRequest {
    pub period_type: PeriodType,
    pub period_key: String,
}

/// POST /api/departments/:id/rollup - 手动触发幂等汇总 (经理及以上)
pub async fn rollup(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<RollupRequest>,
) -> AppResult<Json<Option<DepartmentReport>>> {
    department::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Department {} not found", id)))?;

    let result = rollup::aggregate(
        &state.pool,
        &state.clock,
        id,
        req.period_type,
        &req.period_key,
    )
    .await?;

    Ok(Json(result))
}
