//! 服务器配置
//!
//! # 环境变量
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | WORK_DIR | /var/lib/tempo | 工作目录（数据库、日志） |
//! | HTTP_PORT | 3000 | HTTP 服务端口 |
//! | ENVIRONMENT | development | 运行环境 |
//! | TIMEZONE | Asia/Jakarta | 业务时区 |
//! | WORK_HOURS_WEEKDAY | 07:30-17:00 | 周一至周五开放窗口 |
//! | WORK_HOURS_SATURDAY | 07:30-13:00 | 周六开放窗口 |
//! | WORK_HOURS_SUNDAY | (空 = 关闭) | 周日开放窗口 |
//! | SUPERVISOR_CUTOFF | 19:00 | 主管门禁截止时刻 |
//! | SESSION_TTL_HOURS | 12 | 会话有效期（小时） |
//! | SCHEDULE_TIME | 05:30 | 定时任务每日触发时刻（业务时区） |
//! | WEEKLY_GENERATION_DAY | MON | 周报生成触发的星期 |
//! | TWO_FACTOR_KEY | (开发用固定值) | 2FA 密封密钥（64 位 hex = 32 字节） |
//!
//! # 示例
//!
//! ```ignore
//! WORK_DIR=/data/tempo HTTP_PORT=8080 TIMEZONE=Asia/Jakarta cargo run
//! ```

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;

use crate::access::WorkingHours;
use crate::auth::JwtConfig;

/// 开发环境兜底密钥（"dev-only-tempo-2fa-key-32bytes!!" 的 hex）
/// 生产必须通过 TWO_FACTOR_KEY 覆盖
const DEV_TWO_FACTOR_KEY: &str =
    "6465762d6f6e6c792d74656d706f2d3266612d6b65792d333262797465732121";

/// 服务器配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 业务时区 — 考勤日期、工作时间窗口、定时任务全部以此为准
    pub timezone: Tz,
    /// 全局工作时间窗口（星期 → 开放区间）
    pub working_hours: WorkingHours,
    /// 主管门禁截止时刻（已打卡且未下班的主管，过此时刻需走延时通道）
    pub supervisor_cutoff: NaiveTime,
    /// 会话有效期（小时）
    pub session_ttl_hours: i64,
    /// 定时任务每日触发时刻（业务时区）
    pub schedule_time: NaiveTime,
    /// 周报生成触发的星期
    pub weekly_generation_day: Weekday,
    /// 2FA 密封密钥（hex 编码的 32 字节）
    pub two_factor_key: String,
    /// 审计日志通道容量
    pub audit_buffer_size: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let timezone: Tz = std::env::var("TIMEZONE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(chrono_tz::Asia::Jakarta);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/tempo".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone,
            working_hours: WorkingHours::from_env(),
            supervisor_cutoff: parse_time_env("SUPERVISOR_CUTOFF", 19, 0),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            schedule_time: parse_time_env("SCHEDULE_TIME", 5, 30),
            weekly_generation_day: std::env::var("WEEKLY_GENERATION_DAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Weekday::Mon),
            two_factor_key: std::env::var("TWO_FACTOR_KEY")
                .unwrap_or_else(|_| DEV_TWO_FACTOR_KEY.into()),
            audit_buffer_size: 256,
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_time_env(var: &str, default_hour: u32, default_min: u32) -> NaiveTime {
    std::env::var(var)
        .ok()
        .and_then(|v| NaiveTime::parse_from_str(&v, "%H:%M").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(default_hour, default_min, 0).unwrap())
}
