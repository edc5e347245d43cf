//! Tempo Server - 企业考勤与审批工作流服务
//!
//! # 架构概述
//!
//! 本模块是 Tempo Server 的主入口，提供以下核心功能：
//!
//! - **门禁** (`access`): 工作时间硬闸 + 按用户考勤/延时决策
//! - **认证** (`auth`): Argon2 密码 + 锁定守卫 + TOTP 2FA + 会话登记
//! - **报告** (`reports`): 四级审批状态机、任务锁、部门汇总、定时生成
//! - **审计** (`audit`): 不可变审计日志 (SHA256 哈希链)
//! - **数据库** (`db`): 嵌入式 SQLite (sqlx, WAL)
//! - **HTTP API** (`api`): RESTful API + WebSocket 事件流
//!
//! # 模块结构
//!
//! ```text
//! tempo-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # JWT、凭证守卫、2FA、会话、中间件
//! ├── access/        # 访问决策引擎、工作时间窗口
//! ├── reports/       # 审批状态机、任务锁、汇总、调度器
//! ├── audit/         # 审计日志
//! ├── services/      # 在线状态、站内通知
//! ├── message/       # 广播总线
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层
//! └── utils/         # 错误、日志、时间、校验
//! ```

pub mod access;
pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod message;
pub mod reports;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();

    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        log_dir.as_deref(),
    );

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  ______
 /_  __/__  ____ ___  ____  ____
  / / / _ \/ __ `__ \/ __ \/ __ \
 / / /  __/ / / / / / /_/ / /_/ /
/_/  \___/_/ /_/ /_/ .___/\____/
                  /_/
    "#
    );
}
