//! Account Model

use serde::{Deserialize, Serialize};

/// Account role, lowest to highest tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Supervisor,
    Manager,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "EMPLOYEE",
            Self::Supervisor => "SUPERVISOR",
            Self::Manager => "MANAGER",
            Self::Administrator => "ADMINISTRATOR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EMPLOYEE" => Some(Self::Employee),
            "SUPERVISOR" => Some(Self::Supervisor),
            "MANAGER" => Some(Self::Manager),
            "ADMINISTRATOR" => Some(Self::Administrator),
            _ => None,
        }
    }

    /// Management tier: bypasses the attendance gate, authors whose reports
    /// skip the supervisor review tier.
    pub fn is_management(&self) -> bool {
        matches!(self, Self::Manager | Self::Administrator)
    }

    /// Roles allowed to decide time extensions.
    pub fn can_decide_extensions(&self) -> bool {
        matches!(self, Self::Supervisor | Self::Manager | Self::Administrator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Second-factor method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TwoFactorMethod {
    #[default]
    Totp,
}

/// Security settings blob, stored as JSON on the account row.
///
/// Versioned, explicitly named fields; every write goes through the pure
/// [`SecuritySettings::apply`] merge instead of ad-hoc document patching.
/// Secrets and backup codes are stored only in sealed (authenticated
/// encrypted, base64) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default = "SecuritySettings::current_version")]
    pub version: u32,
    #[serde(default)]
    pub two_factor_enabled: bool,
    #[serde(default)]
    pub two_factor_method: TwoFactorMethod,
    /// Sealed TOTP secret (None until enrolled)
    #[serde(default)]
    pub totp_secret: Option<String>,
    /// Sealed single-use backup codes
    #[serde(default)]
    pub backup_codes: Vec<String>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            version: Self::current_version(),
            two_factor_enabled: false,
            two_factor_method: TwoFactorMethod::Totp,
            totp_secret: None,
            backup_codes: Vec::new(),
        }
    }
}

impl SecuritySettings {
    pub const fn current_version() -> u32 {
        1
    }

    /// Pure merge: old settings + patch → new settings.
    ///
    /// Disabling two-factor discards the secret and backup codes so a
    /// re-enable always starts from a fresh enrollment.
    pub fn apply(&self, patch: &SecuritySettingsPatch) -> Self {
        let mut next = self.clone();
        next.version = Self::current_version();
        if let Some(method) = patch.two_factor_method {
            next.two_factor_method = method;
        }
        if let Some(secret) = &patch.totp_secret {
            next.totp_secret = Some(secret.clone());
        }
        if let Some(codes) = &patch.backup_codes {
            next.backup_codes = codes.clone();
        }
        if let Some(enabled) = patch.two_factor_enabled {
            next.two_factor_enabled = enabled;
            if !enabled {
                next.totp_secret = None;
                next.backup_codes.clear();
            }
        }
        next
    }
}

/// Partial update for [`SecuritySettings`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecuritySettingsPatch {
    pub two_factor_enabled: Option<bool>,
    pub two_factor_method: Option<TwoFactorMethod>,
    /// Already-sealed secret (the server seals plaintext before patching)
    pub totp_secret: Option<String>,
    /// Already-sealed backup codes
    pub backup_codes: Option<Vec<String>>,
}

/// Account entity
///
/// Accounts are never deleted, only deactivated (`is_active = false`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub hash_pass: String,
    pub role: Role,
    pub department_id: Option<i64>,
    /// Consecutive failed password attempts since the last success
    pub failed_attempts: i64,
    /// Lockout flag; an expired `lock_expires_at` is cleared lazily on the
    /// next authentication attempt
    pub locked: bool,
    /// Unix millis; None = indefinite (manual admin lock)
    pub lock_expires_at: Option<i64>,
    pub is_online: bool,
    pub last_active_at: Option<i64>,
    pub last_login_at: Option<i64>,
    /// Day of month on which this account's monthly report is generated
    pub month_end_day: i64,
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    #[cfg_attr(feature = "db", sqlx(json))]
    pub security: SecuritySettings,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Account response (no credential material)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub is_online: bool,
    pub locked: bool,
    pub is_active: bool,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<i64>,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            email: a.email,
            display_name: a.display_name,
            role: a.role,
            department_id: a.department_id,
            is_online: a.is_online,
            locked: a.locked,
            is_active: a.is_active,
            two_factor_enabled: a.security.two_factor_enabled,
            last_login_at: a.last_login_at,
        }
    }
}

/// Create account payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreate {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub department_id: Option<i64>,
    pub month_end_day: Option<i64>,
}

/// Update account payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_end_day: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_enables_two_factor_with_secret() {
        let base = SecuritySettings::default();
        let next = base.apply(&SecuritySettingsPatch {
            two_factor_enabled: Some(true),
            totp_secret: Some("sealed-secret".into()),
            backup_codes: Some(vec!["sealed-a".into(), "sealed-b".into()]),
            ..Default::default()
        });
        assert!(next.two_factor_enabled);
        assert_eq!(next.totp_secret.as_deref(), Some("sealed-secret"));
        assert_eq!(next.backup_codes.len(), 2);
        // base is untouched — apply is pure
        assert!(!base.two_factor_enabled);
    }

    #[test]
    fn merge_disable_discards_secret_material() {
        let enabled = SecuritySettings {
            two_factor_enabled: true,
            totp_secret: Some("sealed".into()),
            backup_codes: vec!["sealed-a".into()],
            ..Default::default()
        };
        let next = enabled.apply(&SecuritySettingsPatch {
            two_factor_enabled: Some(false),
            ..Default::default()
        });
        assert!(!next.two_factor_enabled);
        assert!(next.totp_secret.is_none());
        assert!(next.backup_codes.is_empty());
    }

    #[test]
    fn merge_without_fields_is_identity_except_version() {
        let base = SecuritySettings {
            version: 0,
            two_factor_enabled: true,
            totp_secret: Some("sealed".into()),
            ..Default::default()
        };
        let next = base.apply(&SecuritySettingsPatch::default());
        assert_eq!(next.version, SecuritySettings::current_version());
        assert_eq!(next.totp_secret, base.totp_secret);
        assert_eq!(next.two_factor_enabled, base.two_factor_enabled);
    }

    #[test]
    fn role_ordering_matches_tiers() {
        assert!(Role::Administrator > Role::Manager);
        assert!(Role::Manager > Role::Supervisor);
        assert!(Role::Supervisor > Role::Employee);
        assert!(Role::Manager.is_management());
        assert!(!Role::Supervisor.is_management());
        assert!(Role::Supervisor.can_decide_extensions());
        assert!(!Role::Employee.can_decide_extensions());
    }
}
