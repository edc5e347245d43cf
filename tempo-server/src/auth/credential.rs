//! 凭证校验与锁定守卫
//!
//! 登录的第一道关卡：密码校验、连续失败计数、定时锁定与惰性解锁。
//! 每种结果（成功、失败、锁定、解锁）都会落一条审计记录。
//!
//! 成功侧的收尾（计数清零、时间戳、在线标记）拆在
//! [`on_login_success`]，由登录流程在第二因子也通过之后调用——
//! 密码对但缺第二因子时，计数器既不增加也不清零。

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use shared::Clock;
use shared::models::Account;
use sqlx::SqlitePool;

use crate::audit::{AuditAction, AuditService};
use crate::auth::extractor::RequestMeta;
use crate::db::repository::account;
use crate::utils::AppError;

/// 连续失败多少次触发锁定
pub const MAX_FAILED_ATTEMPTS: i64 = 5;
/// 锁定时长（分钟）
pub const LOCK_DURATION_MIN: i64 = 30;

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, hash_pass: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash_pass)
        .map_err(|e| AppError::internal(format!("Stored password hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 校验邮箱 + 密码，执行锁定规则
///
/// 成功返回账户；调用方在第二因子通过后再调 [`on_login_success`]。
///
/// # 失败路径
///
/// - 邮箱不存在 / 密码错 → [`AppError::InvalidCredentials`]（统一文案）
/// - 已锁定且未到期 → [`AppError::AccountLocked`]（带剩余分钟）
/// - 账户停用 → 同样按无效凭证处理，不暴露账户存在性
pub async fn authenticate(
    pool: &SqlitePool,
    audit: &AuditService,
    clock: &Clock,
    email: &str,
    password: &str,
    meta: &RequestMeta,
) -> Result<Account, AppError> {
    let now = clock.now_millis();

    let Some(mut acct) = account::find_by_email(pool, email).await? else {
        // 不存在的邮箱与错误密码走同一失败路径
        audit
            .log(
                AuditAction::LoginFailed,
                None,
                meta.ip.clone(),
                meta.user_agent.clone(),
                format!("Login failed for unknown email {}", email),
            )
            .await;
        return Err(AppError::invalid_credentials());
    };

    if !acct.is_active {
        return Err(AppError::invalid_credentials());
    }

    // 惰性解锁：锁已到期则先清理再继续评估
    if acct.locked {
        match acct.lock_expires_at {
            Some(expiry) if expiry <= now => {
                account::clear_lock(pool, acct.id, now).await?;
                audit
                    .log(
                        AuditAction::UserUnlock,
                        Some(acct.id),
                        meta.ip.clone(),
                        meta.user_agent.clone(),
                        "Lock expired, cleared on next attempt".to_string(),
                    )
                    .await;
                acct.locked = false;
                acct.lock_expires_at = None;
                acct.failed_attempts = 0;
            }
            expiry => {
                let minutes_remaining = expiry
                    .map(|e| ((e - now) + 59_999) / 60_000)
                    .unwrap_or(0)
                    .max(0);
                audit
                    .log(
                        AuditAction::LoginFailed,
                        Some(acct.id),
                        meta.ip.clone(),
                        meta.user_agent.clone(),
                        "Login attempt on locked account".to_string(),
                    )
                    .await;
                return Err(AppError::account_locked(minutes_remaining));
            }
        }
    }

    if !verify_password(password, &acct.hash_pass)? {
        let attempts = account::record_failed_attempt(pool, acct.id, now).await?;

        if attempts >= MAX_FAILED_ATTEMPTS {
            let expires_at = now + LOCK_DURATION_MIN * 60_000;
            account::set_lock(pool, acct.id, Some(expires_at), now).await?;
            audit
                .log(
                    AuditAction::UserLock,
                    Some(acct.id),
                    meta.ip.clone(),
                    meta.user_agent.clone(),
                    format!(
                        "Account locked for {} minutes after {} failed attempts",
                        LOCK_DURATION_MIN, attempts
                    ),
                )
                .await;
            return Err(AppError::account_locked(LOCK_DURATION_MIN));
        }

        audit
            .log(
                AuditAction::LoginFailed,
                Some(acct.id),
                meta.ip.clone(),
                meta.user_agent.clone(),
                format!(
                    "Login failed, {} attempt(s) remaining",
                    MAX_FAILED_ATTEMPTS - attempts
                ),
            )
            .await;
        return Err(AppError::invalid_credentials());
    }

    Ok(acct)
}

/// 完整登录成功后的收尾：计数清零、锁清理、登录时间、审计。
pub async fn on_login_success(
    pool: &SqlitePool,
    audit: &AuditService,
    clock: &Clock,
    acct: &Account,
    meta: &RequestMeta,
) -> Result<(), AppError> {
    account::mark_login_success(pool, acct.id, clock.now_millis()).await?;
    audit
        .log(
            AuditAction::LoginSuccess,
            Some(acct.id),
            meta.ip.clone(),
            meta.user_agent.clone(),
            format!("{} logged in", acct.email),
        )
        .await;
    Ok(())
}
