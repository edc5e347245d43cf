//! Time Extension API Handlers
//!
//! 员工发起申请，主管及以上一次性批准或驳回（终态）。
//! 批准立即生效——下一次门禁评估就会看到它。

use axum::{
    Json,
    extract::{Path, State},
};

use crate::audit::AuditAction;
use crate::auth::{CurrentUser, RequestMeta};
use crate::core::ServerState;
use crate::db::repository::extension;
use crate::services::notification;
use crate::utils::time;
use crate::utils::validation::{MAX_NOTE_LEN, validate_required_text};
use crate::utils::{AppError, AppResult};
use shared::models::{ExtensionCreate, ExtensionStatus, NotificationKind, TimeExtension};

const RESOURCE: &str = "extension";

/// POST /api/extensions - 发起延时申请
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ExtensionCreate>,
) -> AppResult<Json<TimeExtension>> {
    validate_required_text(&payload.reason, "reason", MAX_NOTE_LEN)?;

    let now = state.clock.now_millis();
    if payload.extended_until <= now {
        return Err(AppError::validation("extended_until must be in the future"));
    }

    let work_date = match &payload.work_date {
        Some(date) => {
            time::parse_date(date)?;
            date.clone()
        }
        None => time::daily_period_key(state.clock.today(state.config.timezone)),
    };

    let ext = extension::create(&state.pool, user.id, &work_date, &payload, now).await?;

    let id = ext.id.to_string();
    state
        .broadcast_sync(RESOURCE, "created", &id, Some(&ext))
        .await;

    Ok(Json(ext))
}

/// GET /api/extensions/mine - 自己的申请记录
pub async fn mine(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<TimeExtension>>> {
    let exts = extension::find_by_account(&state.pool, user.id, 50).await?;
    Ok(Json(exts))
}

/// GET /api/extensions/pending - 待审批队列 (主管及以上)
pub async fn pending(State(state): State<ServerState>) -> AppResult<Json<Vec<TimeExtension>>> {
    let exts = extension::find_pending(&state.pool).await?;
    Ok(Json(exts))
}

async fn decide(
    state: &ServerState,
    user: &CurrentUser,
    meta: &RequestMeta,
    id: i64,
    status: ExtensionStatus,
) -> Result<TimeExtension, AppError> {
    let existing = extension::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Extension {} not found", id)))?;

    if existing.account_id == user.id {
        return Err(AppError::forbidden("Cannot decide your own extension request"));
    }

    let ext = extension::decide(&state.pool, id, status, user.id, state.clock.now_millis()).await?;

    let action = match status {
        ExtensionStatus::Approved => AuditAction::ExtensionApproved,
        _ => AuditAction::ExtensionRejected,
    };
    state
        .audit
        .log(
            action,
            Some(ext.account_id),
            meta.ip.clone(),
            meta.user_agent.clone(),
            format!(
                "Extension for {} until {} {} by {}",
                ext.work_date,
                ext.extended_until,
                status.as_str().to_lowercase(),
                user.email
            ),
        )
        .await;

    notification::notify(
        state,
        ext.account_id,
        NotificationKind::ExtensionDecided,
        &format!("Time extension {}", status.as_str().to_lowercase()),
        &format!("Your extension request for {} was {}", ext.work_date, status.as_str().to_lowercase()),
    )
    .await;

    let id_str = ext.id.to_string();
    state
        .broadcast_sync(RESOURCE, "decided", &id_str, Some(&ext))
        .await;

    Ok(ext)
}

/// POST /api/extensions/:id/approve (主管及以上)
pub async fn approve(
    State(state): State<ServerState>,
    user: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> AppResult<Json<TimeExtension>> {
    let ext = decide(&state, &user, &meta, id, ExtensionStatus::Approved).await?;
    Ok(Json(ext))
}

/// POST /api/extensions/:id/reject (主管及以上)
pub async fn reject(
    State(state): State<ServerState>,
    user: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> AppResult<Json<TimeExtension>> {
    let ext = decide(&state, &user, &meta, id, ExtensionStatus::Rejected).await?;
    Ok(Json(ext))
}
