//! Account API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::audit::AuditAction;
use crate::auth::{CurrentUser, RequestMeta, credential, session};
use crate::core::ServerState;
use crate::db::repository::account;
use crate::utils::validation::{MAX_NAME_LEN, MAX_PASSWORD_LEN, validate_required_text};
use crate::utils::{AppError, AppResponse, AppResult, ok};
use shared::message::BusMessage;
use shared::models::{AccountCreate, AccountResponse, AccountUpdate, Role};

/// GET /api/accounts - 全部账户（含停用）
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<AccountResponse>>> {
    let accounts = account::find_all(&state.pool).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// GET /api/accounts/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AccountResponse>> {
    let acct = account::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Account {} not found", id)))?;
    Ok(Json(AccountResponse::from(acct)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub department_id: Option<i64>,
    pub month_end_day: Option<i64>,
}

/// POST /api/accounts - 创建账户 (管理员)
pub async fn create(
    State(state): State<ServerState>,
    Json(req): Json<CreateAccountRequest>,
) -> AppResult<Json<AccountResponse>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    if let Some(name) = &req.display_name {
        validate_required_text(name, "display_name", MAX_NAME_LEN)?;
    }
    if let Some(day) = req.month_end_day
        && !(1..=28).contains(&day)
    {
        return Err(AppError::validation("month_end_day must be 1..=28"));
    }

    let hash_pass = credential::hash_password(&req.password)?;
    let acct = account::create(
        &state.pool,
        AccountCreate {
            email: req.email,
            password: String::new(), // 明文不进入存储层
            display_name: req.display_name,
            role: req.role,
            department_id: req.department_id,
            month_end_day: req.month_end_day,
        },
        hash_pass,
        state.clock.now_millis(),
    )
    .await?;

    Ok(Json(AccountResponse::from(acct)))
}

/// PUT /api/accounts/:id - 更新账户 (管理员；账户只停用，不删除)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<AccountUpdate>,
) -> AppResult<Json<AccountResponse>> {
    if let Some(password) = &req.password {
        validate_required_text(password, "password", MAX_PASSWORD_LEN)?;
    }
    let hash_pass = match &req.password {
        Some(p) => Some(credential::hash_password(p)?),
        None => None,
    };

    let acct = account::update(&state.pool, id, req, hash_pass, state.clock.now_millis()).await?;
    Ok(Json(AccountResponse::from(acct)))
}

/// POST /api/accounts/:id/lock - 手动锁定（无限期，直到解锁）
pub async fn lock(
    State(state): State<ServerState>,
    user: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<()>>> {
    let target = account::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Account {} not found", id)))?;

    account::set_lock(&state.pool, target.id, None, state.clock.now_millis()).await?;
    session::invalidate_all(&state.pool, &state.clock, target.id).await?;

    state
        .audit
        .log(
            AuditAction::UserLock,
            Some(target.id),
            meta.ip,
            meta.user_agent,
            format!("Account locked by administrator {}", user.email),
        )
        .await;

    Ok(ok(()))
}

/// POST /api/accounts/:id/unlock
pub async fn unlock(
    State(state): State<ServerState>,
    user: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<()>>> {
    let target = account::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Account {} not found", id)))?;

    account::clear_lock(&state.pool, target.id, state.clock.now_millis()).await?;

    state
        .audit
        .log(
            AuditAction::UserUnlock,
            Some(target.id),
            meta.ip,
            meta.user_agent,
            format!("Account unlocked by administrator {}", user.email),
        )
        .await;

    Ok(ok(()))
}

/// POST /api/accounts/:id/force-logout - 强制下线 (经理及以上)
pub async fn force_logout(
    State(state): State<ServerState>,
    user: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<u64>>> {
    let target = account::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Account {} not found", id)))?;

    let count = session::invalidate_all(&state.pool, &state.clock, target.id).await?;

    state
        .audit
        .log(
            AuditAction::ForcedLogout,
            Some(target.id),
            meta.ip,
            meta.user_agent,
            format!("{} session(s) invalidated by {}", count, user.email),
        )
        .await;

    state.bus.publish(BusMessage::force_logout(target.id));

    Ok(ok(count))
}

#[derive(Debug, Deserialize)]
pub struct MonthEndDayRequest {
    pub month_end_day: i64,
}

/// PUT /api/accounts/me/month-end-day - 自助设置月报生成日
pub async fn set_month_end_day(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<MonthEndDayRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    if !(1..=28).contains(&req.month_end_day) {
        return Err(AppError::validation("month_end_day must be 1..=28"));
    }

    account::update(
        &state.pool,
        user.id,
        AccountUpdate {
            month_end_day: Some(req.month_end_day),
            ..Default::default()
        },
        None,
        state.clock.now_millis(),
    )
    .await?;

    Ok(ok(()))
}
