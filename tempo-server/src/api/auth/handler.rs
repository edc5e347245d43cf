//! Auth API Handlers
//!
//! 登录编排：凭证守卫 → 第二因子 → 成功收尾 → 会话登记 → 签发 JWT。
//! 密码对但缺码时返回 `SecondFactorRequired`（重新提示信号），失败
//! 计数不变。

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::audit::AuditAction;
use crate::auth::two_factor::TwoFactorVerifier;
use crate::auth::{CurrentUser, RequestMeta, credential, session};
use crate::core::ServerState;
use crate::db::repository::{account, password_reset};
use crate::services::presence;
use crate::utils::validation::{MAX_PASSWORD_LEN, validate_required_text};
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};
use shared::models::{AccountResponse, SecuritySettingsPatch};

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// TOTP 或备用码；2FA 开启且缺失时返回 SecondFactorRequired
    pub code: Option<String>,
}

/// Login response with JWT token
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountResponse,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<ServerState>,
    meta: RequestMeta,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AppResponse<LoginResponse>>> {
    req.validate()
        .map_err(|_| AppError::invalid_credentials())?;
    validate_required_text(&req.password, "password", MAX_PASSWORD_LEN)
        .map_err(|_| AppError::invalid_credentials())?;

    let acct = credential::authenticate(
        &state.pool,
        &state.audit,
        &state.clock,
        &req.email,
        &req.password,
        &meta,
    )
    .await?;

    // 第二因子（仅在账户开启时）
    if acct.security.two_factor_enabled {
        let Some(code) = req.code.as_deref() else {
            return Err(AppError::SecondFactorRequired);
        };

        let verifier = TwoFactorVerifier::new(&state.config.two_factor_key)?;
        match verifier.verify(&acct.security, code, state.clock.now_millis()) {
            Ok(None) => {}
            Ok(Some(updated)) => {
                // 备用码命中已消费，持久化缩减后的集合
                account::update_security(&state.pool, acct.id, &updated, state.clock.now_millis())
                    .await?;
            }
            Err(AppError::InvalidSecondFactor) => {
                state
                    .audit
                    .log(
                        AuditAction::SecondFactorFailed,
                        Some(acct.id),
                        meta.ip.clone(),
                        meta.user_agent.clone(),
                        "Second factor verification failed".to_string(),
                    )
                    .await;
                return Err(AppError::InvalidSecondFactor);
            }
            Err(e) => return Err(e),
        }
    }

    credential::on_login_success(&state.pool, &state.audit, &state.clock, &acct, &meta).await?;
    presence::heartbeat(&state, acct.id).await?;

    let sess = session::register(
        &state.pool,
        &state.audit,
        &state.clock,
        acct.id,
        state.config.session_ttl_hours,
        &meta,
    )
    .await?;

    let token = state
        .jwt_service
        .generate_token(acct.id, &acct.email, &acct.display_name, acct.role, sess.id)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        account_id = acct.id,
        email = %acct.email,
        role = %acct.role,
        "User logged in successfully"
    );

    Ok(ok(LoginResponse {
        token,
        user: AccountResponse::from(acct),
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<ServerState>,
    user: CurrentUser,
    meta: RequestMeta,
) -> AppResult<Json<AppResponse<()>>> {
    session::logout(&state.pool, user.session_id).await?;
    presence::mark_offline(&state, user.id).await?;

    state
        .audit
        .log(
            AuditAction::Logout,
            Some(user.id),
            meta.ip,
            meta.user_agent,
            format!("{} logged out", user.email),
        )
        .await;

    Ok(ok(()))
}

/// GET /api/auth/me - 当前用户信息
pub async fn me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<AccountResponse>>> {
    let acct = account::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;
    Ok(ok(AccountResponse::from(acct)))
}

/// POST /api/auth/heartbeat - 在线心跳
pub async fn heartbeat(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<bool>>> {
    presence::heartbeat(&state, user.id).await?;
    Ok(ok(true))
}

/// 2FA 开通响应 — 明文秘密与备用码只在这一次返回
#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    /// hex 编码的 TOTP 秘密（录入认证器）
    pub secret: String,
    /// 一次性备用码
    pub backup_codes: Vec<String>,
}

/// POST /api/auth/two-factor/setup - 开通 2FA（自助）
pub async fn two_factor_setup(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<TwoFactorSetupResponse>>> {
    let acct = account::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    let verifier = TwoFactorVerifier::new(&state.config.two_factor_key)?;
    let (plain_secret, sealed_secret) = verifier.generate_secret()?;
    let (plain_codes, sealed_codes) = verifier.generate_backup_codes()?;

    let updated = acct.security.apply(&SecuritySettingsPatch {
        two_factor_enabled: Some(true),
        totp_secret: Some(sealed_secret),
        backup_codes: Some(sealed_codes),
        ..Default::default()
    });
    account::update_security(&state.pool, acct.id, &updated, state.clock.now_millis()).await?;

    Ok(ok_with_message(
        TwoFactorSetupResponse {
            secret: plain_secret,
            backup_codes: plain_codes,
        },
        "Store the backup codes now, they will not be shown again",
    ))
}

/// POST /api/auth/two-factor/disable - 关闭 2FA（自助，丢弃秘密材料）
pub async fn two_factor_disable(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<()>>> {
    let acct = account::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    let updated = acct.security.apply(&SecuritySettingsPatch {
        two_factor_enabled: Some(false),
        ..Default::default()
    });
    account::update_security(&state.pool, acct.id, &updated, state.clock.now_millis()).await?;

    Ok(ok(()))
}

/// 重置令牌有效期（毫秒）
const RESET_TOKEN_TTL_MS: i64 = 30 * 60 * 1000;

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetIssued {
    /// 仅开发环境回显（生产经由邮件通道送达，本系统不定义投递）
    pub token: Option<String>,
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// POST /api/auth/password-reset/request
///
/// 无论邮箱是否存在都返回相同的成功响应（防枚举）。
pub async fn password_reset_request(
    State(state): State<ServerState>,
    meta: RequestMeta,
    Json(req): Json<PasswordResetRequest>,
) -> AppResult<Json<AppResponse<PasswordResetIssued>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let mut dev_token = None;

    if let Some(acct) = account::find_by_email(&state.pool, &req.email).await? {
        use ring::rand::{SecureRandom, SystemRandom};
        let mut bytes = [0u8; 32];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| AppError::internal("Failed to generate reset token"))?;
        let token = hex::encode(bytes);

        let now = state.clock.now_millis();
        password_reset::create(
            &state.pool,
            acct.id,
            &hash_token(&token),
            now + RESET_TOKEN_TTL_MS,
            now,
        )
        .await?;

        state
            .audit
            .log(
                AuditAction::PasswordResetRequested,
                Some(acct.id),
                meta.ip.clone(),
                meta.user_agent.clone(),
                "Password reset requested".to_string(),
            )
            .await;

        if state.config.is_development() {
            dev_token = Some(token);
        }
    }

    Ok(ok_with_message(
        PasswordResetIssued { token: dev_token },
        "If the email is registered, a reset link has been sent",
    ))
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

/// POST /api/auth/password-reset/confirm
pub async fn password_reset_confirm(
    State(state): State<ServerState>,
    meta: RequestMeta,
    Json(req): Json<PasswordResetConfirm>,
) -> AppResult<Json<AppResponse<()>>> {
    validate_required_text(&req.new_password, "new_password", MAX_PASSWORD_LEN)?;

    let now = state.clock.now_millis();
    let reset = password_reset::find_valid(&state.pool, &hash_token(&req.token), now)
        .await?
        .ok_or_else(|| AppError::validation("Invalid or expired reset token"))?;

    if !password_reset::consume(&state.pool, reset.id).await? {
        return Err(AppError::conflict("Reset token already used"));
    }

    let hash_pass = credential::hash_password(&req.new_password)?;
    account::set_password(&state.pool, reset.account_id, hash_pass, now).await?;
    account::clear_lock(&state.pool, reset.account_id, now).await?;
    session::invalidate_all(&state.pool, &state.clock, reset.account_id).await?;

    state
        .audit
        .log(
            AuditAction::PasswordResetCompleted,
            Some(reset.account_id),
            meta.ip,
            meta.user_agent,
            "Password reset completed, all sessions invalidated".to_string(),
        )
        .await;

    Ok(ok(()))
}
