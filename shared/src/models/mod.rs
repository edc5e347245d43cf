//! Domain models shared between server and clients
//!
//! Plain serde structs mapping 1:1 to SQL columns. `sqlx::FromRow` derives
//! are feature-gated behind `db` so client builds stay free of sqlx.

pub mod account;
pub mod attendance;
pub mod department;
pub mod extension;
pub mod notification;
pub mod report;
pub mod session;
pub mod work_task;

pub use account::{
    Account, AccountCreate, AccountResponse, AccountUpdate, Role, SecuritySettings,
    SecuritySettingsPatch, TwoFactorMethod,
};
pub use attendance::{AttendanceRecord, ClockPayload};
pub use department::{Department, DepartmentReport};
pub use extension::{ExtensionCreate, ExtensionStatus, TimeExtension};
pub use notification::{Notification, NotificationKind};
pub use report::{PeriodType, Report, ReportCreate, ReportStatus, RejectPayload, TransitionPayload};
pub use session::Session;
pub use work_task::{
    SubTask, SubTaskCreate, SubTaskUpdate, TaskStatus, WorkTask, WorkTaskCreate, WorkTaskUpdate,
};
