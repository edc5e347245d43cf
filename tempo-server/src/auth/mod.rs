//! 认证模块
//!
//! - [`jwt`] - JWT 令牌服务与当前用户上下文
//! - [`credential`] - 密码校验、失败计数、定时锁定
//! - [`two_factor`] - TOTP / 备用码 / 秘密密封
//! - [`session`] - 会话登记（并发上限、强制下线）
//! - [`middleware`] - 认证与门禁中间件
//! - [`extractor`] - CurrentUser / RequestMeta 提取器

pub mod credential;
pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod session;
pub mod two_factor;

pub use extractor::RequestMeta;
pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{CurrentUserExt, attendance_gate, require_auth, require_role, working_hours_gate};
pub use two_factor::TwoFactorVerifier;
