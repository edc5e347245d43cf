//! 认证与门禁中间件
//!
//! 三层关卡，由外向内依次执行：
//!
//! 1. [`require_auth`] — JWT 校验，注入 [`CurrentUser`]
//! 2. [`working_hours_gate`] — 全局工作时间硬闸（管理员豁免；窗口外无
//!    有效延时 → 重定向到说明页，不在数据层拒绝）
//! 3. [`attendance_gate`] — 按用户的考勤/延时门禁（每个请求重新评估，
//!    不缓存）
//!
//! # 跳过认证的路径
//!
//! - `OPTIONS *` (CORS 预检)
//! - 非 `/api/` 路径
//! - `/api/auth/login`、`/api/auth/password-reset/*`
//! - `/api/health`、`/api/info/*`
//! - `/api/events` (WebSocket 升级，握手时以 query token 校验)

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Redirect, IntoResponse, Response},
};
use shared::models::Role;

use crate::access;
use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

/// 信息页路径 — 工作时间外的请求被重定向到这里
pub const OUTSIDE_HOURS_PATH: &str = "/api/info/outside-hours";

/// 无需 JWT 的公共路径
fn is_public_path(path: &str) -> bool {
    path == "/api/auth/login"
        || path.starts_with("/api/auth/password-reset")
        || path == "/api/health"
        || path.starts_with("/api/info/")
        || path == "/api/events"
}

/// 考勤门禁豁免路径 — 打卡、登出、延时申请必须在 denied 状态下仍可达，
/// 否则没打卡的人永远打不上卡
fn is_attendance_exempt(path: &str) -> bool {
    path.starts_with("/api/auth/")
        || path.starts_with("/api/attendance/")
        || path == "/api/extensions"
        || path == "/api/extensions/mine"
        || path.starts_with("/api/notifications")
}

/// 认证中间件 - 要求用户登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT。
/// 验证成功后将 [`CurrentUser`] 注入请求扩展。
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    // 允许 CORS 预检的 OPTIONS 请求 (跳过认证)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (让它们正常返回 404)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    if is_public_path(path) {
        return Ok(next.run(req).await);
    }

    let jwt_service = state.get_jwt_service();
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthorized());
        }
    };

    match jwt_service.validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::try_from(claims)
                .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {}", e)))?;
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );

            match e {
                crate::auth::JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

/// 全局工作时间硬闸
///
/// 独立于个人考勤状态，对所有非管理员角色生效，在按用户门禁之前评估。
/// 窗口外且无生效延时的请求被重定向到信息页，而不是返回 403。
pub async fn working_hours_gate(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == http::Method::OPTIONS
        || !path.starts_with("/api/")
        || is_public_path(path)
    {
        return Ok(next.run(req).await);
    }

    // require_auth 在外层，未注入用户说明路径是公共的
    let Some(user) = req.extensions().get::<CurrentUser>().cloned() else {
        return Ok(next.run(req).await);
    };

    if user.role == Role::Administrator {
        return Ok(next.run(req).await);
    }

    let now_local = state.clock.now_in(state.config.timezone);
    if state.config.working_hours.is_open_at(now_local) {
        return Ok(next.run(req).await);
    }

    // 窗口外：生效中的已批准延时仍可放行
    if access::has_live_extension(&state, user.id).await? {
        return Ok(next.run(req).await);
    }

    security_log!(
        "INFO",
        "outside_working_hours",
        user_id = user.id.to_string(),
        uri = format!("{:?}", req.uri())
    );
    Ok(Redirect::temporary(OUTSIDE_HOURS_PATH).into_response())
}

/// 按用户考勤门禁
///
/// 每个受保护请求都重新评估 [`access::decide`]，不做请求间缓存。
pub async fn attendance_gate(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == http::Method::OPTIONS
        || !path.starts_with("/api/")
        || is_public_path(path)
        || is_attendance_exempt(path)
    {
        return Ok(next.run(req).await);
    }

    let Some(user) = req.extensions().get::<CurrentUser>().cloned() else {
        return Ok(next.run(req).await);
    };

    match access::decide(&state, &user).await? {
        access::AccessDecision::Allowed(_) => Ok(next.run(req).await),
        access::AccessDecision::Denied(reason) => {
            security_log!(
                "INFO",
                "attendance_denied",
                user_id = user.id.to_string(),
                reason = reason.to_string()
            );
            Err(AppError::access_denied(reason))
        }
    }
}

/// 角色检查中间件 - 要求最低角色层级
///
/// # 用法
///
/// ```ignore
/// use axum::middleware;
/// Router::new()
///     .route("/api/accounts", get(handler::list))
///     .layer(middleware::from_fn(require_role(Role::Administrator)));
/// ```
///
/// # 错误
///
/// 层级不足返回 403 Forbidden
pub fn require_role(
    min: Role,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or(AppError::unauthorized())?;

            if !user.has_role(min) {
                security_log!(
                    "WARN",
                    "role_denied",
                    user_id = user.id.to_string(),
                    user_role = user.role.to_string(),
                    required_role = min.to_string()
                );
                return Err(AppError::forbidden(format!(
                    "Requires {} role or above",
                    min
                )));
            }

            Ok(next.run(req).await)
        })
    }
}

/// 从请求中提取 CurrentUser 的扩展方法
pub trait CurrentUserExt {
    /// 从请求扩展中获取 CurrentUser
    ///
    /// # 错误
    ///
    /// 未认证返回 401 Unauthorized
    fn current_user(&self) -> Result<&CurrentUser, AppError>;
}

impl CurrentUserExt for Request {
    fn current_user(&self) -> Result<&CurrentUser, AppError> {
        self.extensions()
            .get::<CurrentUser>()
            .ok_or(AppError::unauthorized())
    }
}
