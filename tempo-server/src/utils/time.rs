//! 时间工具函数 — 业务时区转换
//!
//! 所有日期→时间戳转换统一在 handler / engine 层完成，
//! repository 层只接收 `i64` Unix millis 或 `YYYY-MM-DD` 字符串。
//! "当前时间"一律来自注入的 [`shared::Clock`]。

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 解析 HH:MM 时刻（工作时间窗口、主管门禁截止）
pub fn parse_hhmm(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::validation(format!("Invalid time format: {}", value)))
}

/// 日期 + 时分秒 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_hms_to_millis(date: NaiveDate, hour: u32, min: u32, sec: u32, tz: Tz) -> i64 {
    let naive = date.and_hms_opt(hour, min, sec).unwrap();
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_hms_to_millis(date, 0, 0, 0, tz)
}

/// 日期结束 → 次日 00:00:00 的 Unix millis (业务时区)
///
/// 返回次日零点时间戳，调用方使用 `< end` (不含) 语义。
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    day_start_millis(next_day, tz)
}

/// 周一为一周开始：给定日期所在周的 (周一, 周日)
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = date.weekday().num_days_from_monday() as i64;
    let monday = date - Duration::days(weekday);
    let sunday = monday + Duration::days(6);
    (monday, sunday)
}

/// 周报 period_key: `YYYY-MM-DD_YYYY-MM-DD` (周一_周日)
pub fn weekly_period_key(date: NaiveDate) -> String {
    let (monday, sunday) = week_bounds(date);
    format!("{}_{}", monday.format("%Y-%m-%d"), sunday.format("%Y-%m-%d"))
}

/// 月报 period_key: `YYYY-MM`
pub fn monthly_period_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// 日报 period_key: `YYYY-MM-DD`
pub fn daily_period_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_bounds_are_monday_to_sunday() {
        // 2026-08-07 is a Friday
        let friday = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let (monday, sunday) = week_bounds(friday);
        assert_eq!(monday, NaiveDate::from_ymd_opt(2026, 8, 3).unwrap());
        assert_eq!(sunday, NaiveDate::from_ymd_opt(2026, 8, 9).unwrap());
        assert_eq!(weekly_period_key(friday), "2026-08-03_2026-08-09");
    }

    #[test]
    fn period_keys_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(daily_period_key(date), "2026-08-07");
        assert_eq!(monthly_period_key(date), "2026-08");
    }

    #[test]
    fn parse_hhmm_accepts_valid_rejects_garbage() {
        assert_eq!(
            parse_hhmm("19:00").unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        );
        assert!(parse_hhmm("25:99").is_err());
        assert!(parse_hhmm("7pm").is_err());
    }
}
