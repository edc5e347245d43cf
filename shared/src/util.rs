//! 时间与 ID 工具

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms, collision-free at intranet scale)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// 可注入时钟
///
/// 锁定、延时和工作时间判断全部依赖"当前时间"。所有引擎通过 [`Clock`]
/// 读取 now，而不是直接调用系统时钟，测试可以用 [`Clock::fixed_at`]
/// 钉住或推进时间（正好卡在锁过期、延时截止等边界上）。
#[derive(Clone)]
pub enum Clock {
    /// 系统时钟（生产环境）
    System,
    /// 固定时钟（测试），毫秒值可推进
    Fixed(Arc<AtomicI64>),
}

impl Clock {
    /// 生产用系统时钟
    pub fn system() -> Self {
        Clock::System
    }

    /// 测试用固定时钟，从给定 Unix 毫秒开始
    pub fn fixed_at(millis: i64) -> Self {
        Clock::Fixed(Arc::new(AtomicI64::new(millis)))
    }

    /// 当前 Unix 毫秒
    pub fn now_millis(&self) -> i64 {
        match self {
            Clock::System => now_millis(),
            Clock::Fixed(ms) => ms.load(Ordering::SeqCst),
        }
    }

    /// 当前 UTC 时间
    pub fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_millis())
            .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
    }

    /// 当前业务时区时间
    pub fn now_in(&self, tz: Tz) -> DateTime<Tz> {
        self.now_utc().with_timezone(&tz)
    }

    /// 业务时区的今天
    pub fn today(&self, tz: Tz) -> NaiveDate {
        self.now_in(tz).date_naive()
    }

    /// 推进固定时钟（对系统时钟无效）
    pub fn advance(&self, duration: chrono::Duration) {
        if let Clock::Fixed(ms) = self {
            ms.fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
        }
    }

    /// 重设固定时钟（对系统时钟无效）
    pub fn set_millis(&self, millis: i64) {
        if let Clock::Fixed(ms) = self {
            ms.store(millis, Ordering::SeqCst);
        }
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Clock::System => write!(f, "Clock::System"),
            Clock::Fixed(ms) => write!(f, "Clock::Fixed({})", ms.load(Ordering::SeqCst)),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_ids_are_unique_enough() {
        let a = snowflake_id();
        let b = snowflake_id();
        assert!(a > 0);
        assert!(b > 0);
        // Same millisecond collisions are possible but vanishingly rare
        // across two consecutive calls with 12 random bits.
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = Clock::fixed_at(1_000_000);
        assert_eq!(clock.now_millis(), 1_000_000);
        clock.advance(chrono::Duration::minutes(30));
        assert_eq!(clock.now_millis(), 1_000_000 + 30 * 60 * 1000);
    }

    #[test]
    fn fixed_clock_today_respects_timezone() {
        // 2026-03-01 23:30 UTC is already 2026-03-02 in Asia/Jakarta (UTC+7)
        let utc = chrono::Utc
            .with_ymd_and_hms(2026, 3, 1, 23, 30, 0)
            .unwrap()
            .timestamp_millis();
        let clock = Clock::fixed_at(utc);
        let tz: chrono_tz::Tz = "Asia/Jakarta".parse().unwrap();
        assert_eq!(
            clock.today(tz),
            chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }
}
