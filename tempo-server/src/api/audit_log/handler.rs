//! Audit Log API Handlers

use axum::{
    Json,
    extract::{Query, State},
};

use crate::audit::types::{AuditChainVerification, AuditListResponse, AuditQuery};
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// GET /api/audit-log - 条件查询（时间/类型/账户 + 分页）
pub async fn query(
    State(state): State<ServerState>,
    Query(q): Query<AuditQuery>,
) -> AppResult<Json<AuditListResponse>> {
    let (items, total) = state
        .audit
        .query(&q)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(AuditListResponse { items, total }))
}

/// GET /api/audit-log/verify - 校验哈希链完整性
pub async fn verify_chain(
    State(state): State<ServerState>,
) -> AppResult<Json<AuditChainVerification>> {
    let verification = state
        .audit
        .verify_chain()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(verification))
}
