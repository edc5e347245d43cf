//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 错误码规范
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E1xxx | 登录/凭证错误 | E1002 账户锁定 |
//! | E2xxx | 权限/门禁错误 | E2101 考勤门禁拒绝 |
//! | E3xxx | 令牌错误 | E3002 无效令牌 |
//! | E4xxx | 业务状态冲突 | E4001 非法状态流转 |
//! | E9xxx | 系统错误 | E9002 数据库错误 |
//!
//! # 传播策略
//!
//! 认证与门禁失败在本层收敛为带错误码的响应体，绝不把原始异常漏给
//! 前端；数据库错误隐藏细节只记日志，不得被解释为业务拒绝。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::access::DenyReason;

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误码 (E0000 表示成功)
    pub code: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 认证/凭证错误 ==========
    #[error("Authentication required")]
    /// 未登录 (401)
    Unauthorized,

    #[error("Token expired")]
    /// 令牌过期 (401)
    TokenExpired,

    #[error("Invalid token: {0}")]
    /// 无效令牌 (401)
    InvalidToken(String),

    #[error("Invalid email or password")]
    /// 凭证错误 (401) — 统一文案，防止邮箱枚举
    InvalidCredentials,

    #[error("Account locked")]
    /// 账户锁定 (423)；`minutes_remaining` = 0 表示无限期（管理员手动锁定）
    AccountLocked { minutes_remaining: i64 },

    #[error("Second factor required")]
    /// 需要第二因子 (401) — 重新提示信号，不是硬失败
    SecondFactorRequired,

    #[error("Invalid second factor code")]
    /// 第二因子错误 (401)
    InvalidSecondFactor,

    // ========== 权限/门禁错误 ==========
    #[error("Permission denied: {0}")]
    /// 无权限 (403)
    Forbidden(String),

    #[error("Access denied: {0}")]
    /// 考勤门禁拒绝 (403)，reason ∈ {SESSION_INVALID, NOT_CLOCKED_IN, CLOCKED_OUT}
    AccessDenied(DenyReason),

    // ========== 业务逻辑错误 ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Resource already exists: {0}")]
    /// 资源冲突 (409)
    Conflict(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Invalid transition: {0}")]
    /// 报告状态机非法流转 (409)
    InvalidTransition(String),

    #[error("Resource locked: {0}")]
    /// 任务被已提交日报冻结 (423)
    ResourceLocked(String),

    // ========== 系统错误 ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "E3001", "Please login first".to_string())
            }
            AppError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "E3003", "Token expired".to_string())
            }
            AppError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "E3002", "Invalid token".to_string())
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "E1001",
                "Invalid email or password".to_string(),
            ),
            AppError::AccountLocked { minutes_remaining } => (
                StatusCode::LOCKED,
                "E1002",
                if *minutes_remaining > 0 {
                    format!(
                        "Account locked, try again in {} minute(s)",
                        minutes_remaining
                    )
                } else {
                    "Account locked, contact an administrator".to_string()
                },
            ),
            AppError::SecondFactorRequired => (
                StatusCode::UNAUTHORIZED,
                "E1003",
                "Second factor required".to_string(),
            ),
            AppError::InvalidSecondFactor => (
                StatusCode::UNAUTHORIZED,
                "E1004",
                "Invalid second factor code".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "E2001", msg.clone()),
            AppError::AccessDenied(reason) => {
                (StatusCode::FORBIDDEN, "E2101", reason.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.clone()),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, "E4001", msg.clone()),
            AppError::ResourceLocked(msg) => (StatusCode::LOCKED, "E4002", msg.clone()),
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Unified message for both unknown email and wrong password, so error
    /// responses cannot be used to enumerate accounts.
    pub fn invalid_credentials() -> Self {
        Self::InvalidCredentials
    }

    pub fn account_locked(minutes_remaining: i64) -> Self {
        Self::AccountLocked { minutes_remaining }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn access_denied(reason: DenyReason) -> Self {
        Self::AccessDenied(reason)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn resource_locked(msg: impl Into<String>) -> Self {
        Self::ResourceLocked(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<crate::db::repository::RepoError> for AppError {
    fn from(err: crate::db::repository::RepoError) -> Self {
        use crate::db::repository::RepoError;
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Conflict(msg) => AppError::InvalidTransition(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Result type for API handlers
pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: message.into(),
        data: Some(data),
    })
}
