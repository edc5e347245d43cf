//! 周期性报告调度器
//!
//! 每天在 `schedule_time`（业务时区）触发一轮：
//!
//! - 每周 `weekly_generation_day`：为每个活跃账户生成上一周的周报草稿
//! - 每天：按账户配置的 `month_end_day` 生成当月月报草稿
//! - 每天：重算各部门昨日的日汇总；周初补上周汇总；月初补上月汇总
//!
//! 串行遍历账户/部门，单个失败只记日志，批次绝不中断。

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use shared::models::{Account, NotificationKind, PeriodType, ReportCreate};
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::db::repository::{account, department, report};
use crate::reports::rollup;
use crate::services::notification;
use crate::utils::time;

/// 周期性报告调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct ReportScheduler {
    state: ServerState,
    shutdown: CancellationToken,
}

impl ReportScheduler {
    pub fn new(state: ServerState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    /// 主循环：启动先跑一轮（幂等），之后每天定点触发
    pub async fn run(self) {
        tracing::info!("Report scheduler started");

        self.run_cycle().await;

        loop {
            let tz = self.state.config.timezone;
            let tick = self.state.config.schedule_time;
            let sleep_duration = self.duration_until_next_tick(tick, tz);

            tracing::info!(
                "Next report generation cycle in {} minutes (tick={})",
                sleep_duration.as_secs() / 60,
                tick.format("%H:%M")
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_cycle().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Report scheduler received shutdown signal");
                    return;
                }
            }
        }
    }

    /// 一轮生成 + 汇总
    async fn run_cycle(&self) {
        let tz = self.state.config.timezone;
        let today = self.state.clock.today(tz);

        let accounts = match account::find_active(&self.state.pool).await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!("Report cycle aborted, cannot list accounts: {}", e);
                return;
            }
        };

        if today.weekday() == self.state.config.weekly_generation_day {
            for acct in &accounts {
                if let Err(e) = self.generate_weekly(acct, today).await {
                    tracing::error!(account_id = acct.id, "Weekly generation failed: {}", e);
                }
            }
        }

        for acct in &accounts {
            if i64::from(today.day()) == acct.month_end_day {
                if let Err(e) = self.generate_monthly(acct, today).await {
                    tracing::error!(account_id = acct.id, "Monthly generation failed: {}", e);
                }
            }
        }

        self.run_rollups(today).await;
    }

    /// 上一周的周报草稿（已有则跳过）
    async fn generate_weekly(
        &self,
        acct: &Account,
        today: NaiveDate,
    ) -> Result<(), crate::utils::AppError> {
        let last_week_day = today - Duration::days(7);
        let period_key = time::weekly_period_key(last_week_day);

        if report::find_by_account_period(&self.state.pool, acct.id, PeriodType::Weekly, &period_key)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let (monday, sunday) = time::week_bounds(last_week_day);
        let dailies = report::find_daily_in_key_range(
            &self.state.pool,
            acct.id,
            &time::daily_period_key(monday),
            &time::daily_period_key(sunday),
        )
        .await?;
        if dailies.is_empty() {
            return Ok(());
        }

        let content = compose_period_content(&dailies);
        report::create(
            &self.state.pool,
            acct.id,
            acct.department_id,
            &ReportCreate {
                period_type: PeriodType::Weekly,
                period_key: period_key.clone(),
                content,
                signature: None, // 草稿，等员工签名提交
            },
            self.state.clock.now_millis(),
        )
        .await?;

        notification::notify(
            &self.state,
            acct.id,
            NotificationKind::ReportGenerated,
            "Weekly report draft ready",
            &format!("Draft weekly report for {} is ready to submit", period_key),
        )
        .await;

        Ok(())
    }

    /// 当月月报草稿（按账户 month_end_day 触发，已有则跳过）
    async fn generate_monthly(
        &self,
        acct: &Account,
        today: NaiveDate,
    ) -> Result<(), crate::utils::AppError> {
        let period_key = time::monthly_period_key(today);

        if report::find_by_account_period(&self.state.pool, acct.id, PeriodType::Monthly, &period_key)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let month_start = today.with_day(1).unwrap_or(today);
        let dailies = report::find_daily_in_key_range(
            &self.state.pool,
            acct.id,
            &time::daily_period_key(month_start),
            &time::daily_period_key(today),
        )
        .await?;
        if dailies.is_empty() {
            return Ok(());
        }

        let content = compose_period_content(&dailies);
        report::create(
            &self.state.pool,
            acct.id,
            acct.department_id,
            &ReportCreate {
                period_type: PeriodType::Monthly,
                period_key: period_key.clone(),
                content,
                signature: None,
            },
            self.state.clock.now_millis(),
        )
        .await?;

        notification::notify(
            &self.state,
            acct.id,
            NotificationKind::ReportGenerated,
            "Monthly report draft ready",
            &format!("Draft monthly report for {} is ready to submit", period_key),
        )
        .await;

        Ok(())
    }

    /// 部门汇总：昨日 + 周初补上周 + 月初补上月
    async fn run_rollups(&self, today: NaiveDate) {
        let departments = match department::find_active(&self.state.pool).await {
            Ok(d) => d,
            Err(e) => {
                tracing::error!("Rollup pass aborted, cannot list departments: {}", e);
                return;
            }
        };

        let yesterday = today - Duration::days(1);
        for dept in &departments {
            let mut targets: Vec<(PeriodType, String)> = vec![(
                PeriodType::Daily,
                time::daily_period_key(yesterday),
            )];
            if today.weekday() == self.state.config.weekly_generation_day {
                targets.push((
                    PeriodType::Weekly,
                    time::weekly_period_key(today - Duration::days(7)),
                ));
            }
            if today.day() == 1 {
                targets.push((
                    PeriodType::Monthly,
                    time::monthly_period_key(yesterday),
                ));
            }

            for (period_type, period_key) in targets {
                if let Err(e) = rollup::aggregate(
                    &self.state.pool,
                    &self.state.clock,
                    dept.id,
                    period_type,
                    &period_key,
                )
                .await
                {
                    tracing::error!(
                        department_id = dept.id,
                        %period_type,
                        period_key,
                        "Rollup failed: {}",
                        e
                    );
                }
            }
        }
    }

    /// 计算距离下一次触发时刻的 Duration
    fn duration_until_next_tick(&self, tick: NaiveTime, tz: Tz) -> std::time::Duration {
        let now = self.state.clock.now_in(tz);
        let today = now.date_naive();

        let target_date = if now.time() >= tick {
            today + Duration::days(1)
        } else {
            today
        };

        let target_datetime = target_date
            .and_time(tick)
            .and_local_timezone(tz)
            .single()
            .unwrap_or_else(|| {
                // DST edge case: fallback to +1 min
                (target_date.and_time(tick) + Duration::minutes(1))
                    .and_local_timezone(tz)
                    .latest()
                    .unwrap_or_else(|| {
                        tracing::error!("Cannot resolve local tick time, using fallback");
                        now + Duration::hours(1)
                    })
            });

        let duration = target_datetime.signed_duration_since(now);
        if duration.num_seconds() <= 0 {
            std::time::Duration::from_secs(60)
        } else {
            duration
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60))
        }
    }
}

/// 把一组日报拼成周/月报正文，每天一个标注日期的小节
fn compose_period_content(dailies: &[shared::models::Report]) -> String {
    dailies
        .iter()
        .map(|d| format!("[{}]\n{}", d.period_key, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::Clock;
    use shared::models::{AccountCreate, ReportStatus, Role};

    use crate::auth::credential;
    use crate::core::{Config, ServerState};
    use crate::db::DbService;

    /// Monday 2026-08-10 05:30 Asia/Jakarta — the weekly generation tick
    fn monday_tick_millis() -> i64 {
        chrono_tz::Asia::Jakarta
            .with_ymd_and_hms(2026, 8, 10, 5, 30, 0)
            .unwrap()
            .timestamp_millis()
    }

    async fn seed(state: &ServerState) -> i64 {
        let now = state.clock.now_millis();
        let dept = department::create(&state.pool, "Finance", now).await.unwrap();
        let hash = credential::hash_password("pw").unwrap();
        let acct = account::create(
            &state.pool,
            AccountCreate {
                email: "lia@example.com".into(),
                password: String::new(),
                display_name: None,
                role: Role::Employee,
                department_id: Some(dept.id),
                month_end_day: None,
            },
            hash,
            now,
        )
        .await
        .unwrap();

        // Two signed dailies inside last week (Mon 08-03 .. Sun 08-09)
        for (key, text) in [
            ("2026-08-05", "reconciled ledgers"),
            ("2026-08-07", "closed vendor invoices"),
        ] {
            report::create(
                &state.pool,
                acct.id,
                Some(dept.id),
                &ReportCreate {
                    period_type: PeriodType::Daily,
                    period_key: key.into(),
                    content: text.into(),
                    signature: Some("sig".into()),
                },
                now,
            )
            .await
            .unwrap();
        }

        acct.id
    }

    #[tokio::test]
    async fn weekly_drafts_are_generated_once() {
        let db = DbService::in_memory().await.unwrap();
        let config = Config::with_overrides("/tmp/tempo-test", 0);
        let state = ServerState::with_pool(config, db.pool, Clock::fixed_at(monday_tick_millis()));
        let account_id = seed(&state).await;

        let scheduler = ReportScheduler::new(
            state.clone(),
            tokio_util::sync::CancellationToken::new(),
        );

        scheduler.run_cycle().await;

        let weekly = report::find_by_account_period(
            &state.pool,
            account_id,
            PeriodType::Weekly,
            "2026-08-03_2026-08-09",
        )
        .await
        .unwrap()
        .expect("weekly draft generated");
        assert_eq!(weekly.status, ReportStatus::Draft);
        assert!(weekly.content.contains("reconciled ledgers"));
        assert!(weekly.content.contains("[2026-08-07]"));

        // A second cycle on the same day does not duplicate anything
        scheduler.run_cycle().await;
        let all = report::find_by_account(&state.pool, account_id, Some(PeriodType::Weekly), 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }
}
