//! Report API Handlers
//!
//! 状态流转全部走 [`crate::reports::lifecycle`]，handler 只做载荷校验
//! 和 period_key 形状检查。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{account, report};
use crate::reports::lifecycle;
use crate::utils::time;
use crate::utils::validation::{
    MAX_CONTENT_LEN, MAX_SIGNATURE_LEN, validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{PeriodType, RejectPayload, Report, ReportCreate, TransitionPayload};

const RESOURCE: &str = "report";

/// period_key 必须匹配各自的周期形状
fn validate_period_key(period_type: PeriodType, key: &str) -> AppResult<()> {
    let valid = match period_type {
        PeriodType::Daily => time::parse_date(key).is_ok(),
        PeriodType::Weekly => match key.split_once('_') {
            Some((start, end)) => {
                let (Ok(start), Ok(end)) = (time::parse_date(start), time::parse_date(end)) else {
                    return Err(AppError::validation(format!(
                        "Invalid weekly period key: {key}"
                    )));
                };
                time::week_bounds(start) == (start, end)
            }
            None => false,
        },
        PeriodType::Monthly => {
            key.len() == 7 && time::parse_date(&format!("{key}-01")).is_ok()
        }
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid {} period key: {}",
            period_type, key
        )))
    }
}

/// POST /api/reports - 创建报告
///
/// 带签名 → 直接 SUBMITTED（当日手工提交）；不带 → DRAFT。
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ReportCreate>,
) -> AppResult<Json<Report>> {
    validate_period_key(payload.period_type, &payload.period_key)?;
    validate_required_text(&payload.content, "content", MAX_CONTENT_LEN)?;
    if let Some(sig) = &payload.signature {
        validate_required_text(sig, "signature", MAX_SIGNATURE_LEN)?;
    }

    let acct = account::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    let rep = report::create(
        &state.pool,
        user.id,
        acct.department_id,
        &payload,
        state.clock.now_millis(),
    )
    .await?;

    let id = rep.id.to_string();
    state
        .broadcast_sync(RESOURCE, "created", &id, Some(&rep))
        .await;

    Ok(Json(rep))
}

/// Query params for listing own reports
#[derive(Debug, Deserialize)]
pub struct MineQuery {
    pub period_type: Option<PeriodType>,
    #[serde(default = "default_limit")]
    pub limit: i32,
}

fn default_limit() -> i32 {
    50
}

/// GET /api/reports - 自己的报告
pub async fn mine(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<MineQuery>,
) -> AppResult<Json<Vec<Report>>> {
    let reports =
        report::find_by_account(&state.pool, user.id, query.period_type, query.limit).await?;
    Ok(Json(reports))
}

/// GET /api/reports/:id - 单个报告（本人或主管及以上）
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Report>> {
    let rep = report::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Report {} not found", id)))?;

    if rep.account_id != user.id && !user.has_role(shared::models::Role::Supervisor) {
        return Err(AppError::forbidden("Not your report"));
    }

    Ok(Json(rep))
}

/// POST /api/reports/:id/submit - 员工提交 (DRAFT → SUBMITTED)
pub async fn submit(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> AppResult<Json<Report>> {
    let rep = lifecycle::submit(&state, id, &user, &payload).await?;
    Ok(Json(rep))
}

/// POST /api/reports/:id/supervisor-approve (SUBMITTED → REVIEWED)
pub async fn supervisor_approve(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> AppResult<Json<Report>> {
    let rep = lifecycle::supervisor_approve(&state, id, &user, &payload).await?;
    Ok(Json(rep))
}

/// POST /api/reports/:id/head-approve (REVIEWED → HEAD_REVIEWED)
pub async fn head_approve(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> AppResult<Json<Report>> {
    let rep = lifecycle::head_approve(&state, id, &user, &payload).await?;
    Ok(Json(rep))
}

/// POST /api/reports/:id/manager-approve ({REVIEWED, HEAD_REVIEWED} → APPROVED)
pub async fn manager_approve(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> AppResult<Json<Report>> {
    let rep = lifecycle::manager_approve(&state, id, &user, &payload).await?;
    Ok(Json(rep))
}

/// POST /api/reports/:id/reject (非终态 → REJECTED)
pub async fn reject(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RejectPayload>,
) -> AppResult<Json<Report>> {
    let rep = lifecycle::reject(&state, id, &user, payload.comment.as_deref()).await?;
    Ok(Json(rep))
}

/// GET /api/reports/queue/supervisor - 主管待审队列
pub async fn supervisor_queue(State(state): State<ServerState>) -> AppResult<Json<Vec<Report>>> {
    let reports = report::supervisor_queue(&state.pool).await?;
    Ok(Json(reports))
}

/// GET /api/reports/queue/head - 部门主任待审队列
/// (REVIEWED + 管理层作者的 SUBMITTED)
pub async fn head_queue(State(state): State<ServerState>) -> AppResult<Json<Vec<Report>>> {
    let reports = report::head_queue(&state.pool).await?;
    Ok(Json(reports))
}

/// GET /api/reports/queue/manager - 经理终审队列
pub async fn manager_queue(State(state): State<ServerState>) -> AppResult<Json<Vec<Report>>> {
    let reports = report::manager_queue(&state.pool).await?;
    Ok(Json(reports))
}
