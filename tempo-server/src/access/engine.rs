//! 按用户访问决策引擎
//!
//! 每个受保护请求都重新执行 [`decide`]，决策链：
//!
//! 1. 经理/管理员直接放行（bypass）
//! 2. 会话无效 → `SESSION_INVALID`
//! 3. 今天没有打卡记录 → `NOT_CLOCKED_IN`
//! 4. 已下班打卡 → 查今天的已批准延时，`now < extended_until` 放行
//!    (`EXTENSION`)，否则 `CLOCKED_OUT`
//! 5. 在班中：主管过了截止时刻后同样要走延时通道；其余角色无时刻限制

use serde::Serialize;
use shared::models::Role;

use crate::auth::{CurrentUser, session};
use crate::core::ServerState;
use crate::db::repository::{attendance, extension};
use crate::utils::AppError;
use crate::utils::time::daily_period_key;

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    SessionInvalid,
    NotClockedIn,
    ClockedOut,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SessionInvalid => "SESSION_INVALID",
            Self::NotClockedIn => "NOT_CLOCKED_IN",
            Self::ClockedOut => "CLOCKED_OUT",
        };
        f.write_str(s)
    }
}

/// 放行补充说明
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllowReason {
    /// 依据已批准的延时放行
    Extension,
}

/// 访问决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed(Option<AllowReason>),
    Denied(DenyReason),
}

/// 今天是否存在生效中的已批准延时 (`now < extended_until`)
pub async fn has_live_extension(state: &ServerState, account_id: i64) -> Result<bool, AppError> {
    let now = state.clock.now_millis();
    let today = daily_period_key(state.clock.today(state.config.timezone));
    let ext = extension::find_approved(&state.pool, account_id, &today).await?;
    Ok(ext.map(|e| now < e.extended_until).unwrap_or(false))
}

/// 执行按用户访问决策
pub async fn decide(
    state: &ServerState,
    user: &CurrentUser,
) -> Result<AccessDecision, AppError> {
    // 1. 管理层 bypass
    if user.role.is_management() {
        return Ok(AccessDecision::Allowed(None));
    }

    // 2. 会话有效性
    if !session::is_active(&state.pool, &state.clock, user.session_id).await? {
        return Ok(AccessDecision::Denied(DenyReason::SessionInvalid));
    }

    // 3. 今天的打卡记录
    let tz = state.config.timezone;
    let today = daily_period_key(state.clock.today(tz));
    let record = attendance::find_by_account_date(&state.pool, user.id, &today).await?;
    let Some(record) = record.filter(|r| r.is_clocked_in()) else {
        return Ok(AccessDecision::Denied(DenyReason::NotClockedIn));
    };

    // 4. 已下班 → 只有生效延时能放行
    if record.is_clocked_out() {
        return if has_live_extension(state, user.id).await? {
            Ok(AccessDecision::Allowed(Some(AllowReason::Extension)))
        } else {
            Ok(AccessDecision::Denied(DenyReason::ClockedOut))
        };
    }

    // 5. 在班中：主管受截止时刻约束
    if user.role == Role::Supervisor {
        let now_local = state.clock.now_in(tz).time();
        if now_local >= state.config.supervisor_cutoff {
            return if has_live_extension(state, user.id).await? {
                Ok(AccessDecision::Allowed(Some(AllowReason::Extension)))
            } else {
                Ok(AccessDecision::Denied(DenyReason::ClockedOut))
            };
        }
    }

    Ok(AccessDecision::Allowed(None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::Clock;
    use shared::models::{AccountCreate, ClockPayload, ExtensionCreate, ExtensionStatus, Role};

    use crate::auth::RequestMeta;
    use crate::auth::credential;
    use crate::core::{Config, ServerState};
    use crate::db::DbService;
    use crate::db::repository::account;

    /// 固定时钟：2026-08-07 (周五) 09:00 Asia/Jakarta
    fn friday_morning_millis() -> i64 {
        chrono_tz::Asia::Jakarta
            .with_ymd_and_hms(2026, 8, 7, 9, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    async fn test_state(clock: Clock) -> ServerState {
        let db = DbService::in_memory().await.expect("in-memory db");
        let config = Config::with_overrides("/tmp/tempo-test", 0);
        ServerState::with_pool(config, db.pool, clock)
    }

    async fn seed_user(state: &ServerState, role: Role) -> CurrentUser {
        let hash = credential::hash_password("secret-password").unwrap();
        let acct = account::create(
            &state.pool,
            AccountCreate {
                email: format!("{}@example.com", role.as_str().to_lowercase()),
                password: String::new(),
                display_name: None,
                role,
                department_id: None,
                month_end_day: None,
            },
            hash,
            state.clock.now_millis(),
        )
        .await
        .unwrap();

        let session = crate::auth::session::register(
            &state.pool,
            &state.audit,
            &state.clock,
            acct.id,
            12,
            &RequestMeta::default(),
        )
        .await
        .unwrap();

        CurrentUser {
            id: acct.id,
            email: acct.email,
            display_name: acct.display_name,
            role,
            session_id: session.id,
        }
    }

    #[tokio::test]
    async fn management_bypasses_everything() {
        let state = test_state(Clock::fixed_at(friday_morning_millis())).await;
        let user = seed_user(&state, Role::Manager).await;

        // No attendance record at all, still allowed
        let decision = decide(&state, &user).await.unwrap();
        assert_eq!(decision, AccessDecision::Allowed(None));
    }

    #[tokio::test]
    async fn no_attendance_record_denies_not_clocked_in() {
        let state = test_state(Clock::fixed_at(friday_morning_millis())).await;
        let user = seed_user(&state, Role::Employee).await;

        let decision = decide(&state, &user).await.unwrap();
        assert_eq!(decision, AccessDecision::Denied(DenyReason::NotClockedIn));
    }

    #[tokio::test]
    async fn invalid_session_denies_before_attendance() {
        let state = test_state(Clock::fixed_at(friday_morning_millis())).await;
        let user = seed_user(&state, Role::Employee).await;

        crate::auth::session::invalidate_all(&state.pool, &state.clock, user.id)
            .await
            .unwrap();

        let decision = decide(&state, &user).await.unwrap();
        assert_eq!(decision, AccessDecision::Denied(DenyReason::SessionInvalid));
    }

    #[tokio::test]
    async fn clocked_in_employee_is_allowed() {
        let state = test_state(Clock::fixed_at(friday_morning_millis())).await;
        let user = seed_user(&state, Role::Employee).await;

        let today = daily_period_key(state.clock.today(state.config.timezone));
        crate::db::repository::attendance::clock_in(
            &state.pool,
            user.id,
            &today,
            &ClockPayload::default(),
            state.clock.now_millis(),
        )
        .await
        .unwrap();

        let decision = decide(&state, &user).await.unwrap();
        assert_eq!(decision, AccessDecision::Allowed(None));
    }

    #[tokio::test]
    async fn extension_window_allows_then_expires() {
        let clock = Clock::fixed_at(friday_morning_millis());
        let state = test_state(clock.clone()).await;
        let user = seed_user(&state, Role::Employee).await;
        let supervisor = seed_user(&state, Role::Supervisor).await;

        let today = daily_period_key(clock.today(state.config.timezone));
        let now = clock.now_millis();
        crate::db::repository::attendance::clock_in(
            &state.pool,
            user.id,
            &today,
            &ClockPayload::default(),
            now,
        )
        .await
        .unwrap();
        crate::db::repository::attendance::clock_out(
            &state.pool,
            user.id,
            &today,
            &ClockPayload::default(),
            now + 1,
        )
        .await
        .unwrap();

        // Clocked out, no extension
        assert_eq!(
            decide(&state, &user).await.unwrap(),
            AccessDecision::Denied(DenyReason::ClockedOut)
        );

        // Approved extension valid for 2 more hours
        let ext = crate::db::repository::extension::create(
            &state.pool,
            user.id,
            &today,
            &ExtensionCreate {
                work_date: Some(today.clone()),
                extended_until: now + 2 * 60 * 60 * 1000,
                reason: "finish month-end closing".into(),
            },
            now,
        )
        .await
        .unwrap();
        crate::db::repository::extension::decide(
            &state.pool,
            ext.id,
            ExtensionStatus::Approved,
            supervisor.id,
            now,
        )
        .await
        .unwrap();

        assert_eq!(
            decide(&state, &user).await.unwrap(),
            AccessDecision::Allowed(Some(AllowReason::Extension))
        );

        // Past extended_until the same account/day is denied again
        clock.advance(chrono::Duration::hours(3));
        assert_eq!(
            decide(&state, &user).await.unwrap(),
            AccessDecision::Denied(DenyReason::ClockedOut)
        );
    }

    #[tokio::test]
    async fn supervisor_cutoff_applies_while_clocked_in() {
        let clock = Clock::fixed_at(friday_morning_millis());
        let state = test_state(clock.clone()).await;
        let user = seed_user(&state, Role::Supervisor).await;

        let today = daily_period_key(clock.today(state.config.timezone));
        crate::db::repository::attendance::clock_in(
            &state.pool,
            user.id,
            &today,
            &ClockPayload::default(),
            clock.now_millis(),
        )
        .await
        .unwrap();

        assert_eq!(
            decide(&state, &user).await.unwrap(),
            AccessDecision::Allowed(None)
        );

        // 09:00 + 11h = 20:00, past the 19:00 cutoff
        clock.advance(chrono::Duration::hours(11));
        assert_eq!(
            decide(&state, &user).await.unwrap(),
            AccessDecision::Denied(DenyReason::ClockedOut)
        );
    }
}
