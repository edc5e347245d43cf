//! 全局工作时间窗口
//!
//! 组织级的"星期 → 开放区间"表，外部配置（环境变量），固定业务时区。
//! 只有全局硬闸消费它；按用户的考勤门禁与此无关。

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;

/// 每个星期一个可选开放窗口；None = 当天关闭
#[derive(Debug, Clone)]
pub struct WorkingHours {
    /// 下标 = `weekday.num_days_from_monday()`
    windows: [Option<(NaiveTime, NaiveTime)>; 7],
}

impl WorkingHours {
    /// 从环境变量构造
    ///
    /// | 变量 | 默认 |
    /// |------|------|
    /// | WORK_HOURS_WEEKDAY | 07:30-17:00 |
    /// | WORK_HOURS_SATURDAY | 07:30-13:00 |
    /// | WORK_HOURS_SUNDAY | (空 = 关闭) |
    pub fn from_env() -> Self {
        let weekday = parse_window_env("WORK_HOURS_WEEKDAY", Some(("07:30", "17:00")));
        let saturday = parse_window_env("WORK_HOURS_SATURDAY", Some(("07:30", "13:00")));
        let sunday = parse_window_env("WORK_HOURS_SUNDAY", None);

        Self::new(weekday, saturday, sunday)
    }

    /// 周一~周五共用 weekday 窗口
    pub fn new(
        weekday: Option<(NaiveTime, NaiveTime)>,
        saturday: Option<(NaiveTime, NaiveTime)>,
        sunday: Option<(NaiveTime, NaiveTime)>,
    ) -> Self {
        let mut windows = [weekday; 7];
        windows[Weekday::Sat.num_days_from_monday() as usize] = saturday;
        windows[Weekday::Sun.num_days_from_monday() as usize] = sunday;
        Self { windows }
    }

    /// 指定星期的开放窗口
    pub fn window_for(&self, weekday: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        self.windows[weekday.num_days_from_monday() as usize]
    }

    /// 给定业务时区时刻是否在开放窗口内（闭开区间 `[open, close)`）
    pub fn is_open_at(&self, now: DateTime<Tz>) -> bool {
        let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second())
            .unwrap_or(NaiveTime::MIN);
        match self.window_for(now.weekday()) {
            Some((open, close)) => time >= open && time < close,
            None => false,
        }
    }
}

fn parse_window_env(
    var: &str,
    default: Option<(&str, &str)>,
) -> Option<(NaiveTime, NaiveTime)> {
    let raw = std::env::var(var).ok();
    match raw.as_deref() {
        Some("") => None,
        Some(value) => parse_window(value).or_else(|| {
            tracing::warn!("Invalid {} value '{}', falling back to default", var, value);
            default.and_then(|(o, c)| parse_window(&format!("{o}-{c}")))
        }),
        None => default.and_then(|(o, c)| parse_window(&format!("{o}-{c}"))),
    }
}

/// "HH:MM-HH:MM" → 窗口
fn parse_window(value: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (open, close) = value.split_once('-')?;
    let open = NaiveTime::parse_from_str(open.trim(), "%H:%M").ok()?;
    let close = NaiveTime::parse_from_str(close.trim(), "%H:%M").ok()?;
    (open < close).then_some((open, close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours() -> WorkingHours {
        WorkingHours::new(
            Some((
                NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            )),
            Some((
                NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            )),
            None,
        )
    }

    fn jakarta_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        chrono_tz::Asia::Jakarta
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn weekday_window_open_and_close() {
        let wh = hours();
        // 2026-08-07 is a Friday
        assert!(wh.is_open_at(jakarta_at(2026, 8, 7, 9, 0)));
        assert!(!wh.is_open_at(jakarta_at(2026, 8, 7, 6, 0)));
        assert!(!wh.is_open_at(jakarta_at(2026, 8, 7, 17, 0))); // close is exclusive
    }

    #[test]
    fn saturday_has_short_window_sunday_closed() {
        let wh = hours();
        // 2026-08-08 Saturday, 2026-08-09 Sunday
        assert!(wh.is_open_at(jakarta_at(2026, 8, 8, 12, 59)));
        assert!(!wh.is_open_at(jakarta_at(2026, 8, 8, 14, 0)));
        assert!(!wh.is_open_at(jakarta_at(2026, 8, 9, 9, 0)));
    }

    #[test]
    fn parse_window_rejects_inverted_range() {
        assert!(parse_window("17:00-07:30").is_none());
        assert!(parse_window("07:30-17:00").is_some());
        assert!(parse_window("garbage").is_none());
    }
}
