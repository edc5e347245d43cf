//! 第二因子校验
//!
//! - [`SecretBox`] — 2FA 秘密的静态加密 (ChaCha20-Poly1305，每次密封随机
//!   nonce，密文自带认证标签)。解密失败按配置错误上报，绝不静默当作
//!   校验失败。
//! - TOTP (RFC 6238)：SHA-1 HMAC、30 秒步长、6 位数字、±2 步容差吸收
//!   客户端时钟漂移。
//! - 备用码：常数时间比对，命中即从集合中消费（一次性）。

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ring::aead::{Aad, CHACHA20_POLY1305, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use shared::models::SecuritySettings;

use crate::utils::AppError;

/// TOTP 时间步长（秒）
pub const TOTP_STEP_SECS: i64 = 30;
/// 允许的前后步数（吸收时钟漂移）
pub const TOTP_SKEW_STEPS: i64 = 2;
/// 验证码位数
pub const TOTP_DIGITS: u32 = 6;
/// TOTP 秘密长度（字节）
const SECRET_LEN: usize = 20;
/// 默认生成的备用码数量
pub const BACKUP_CODE_COUNT: usize = 8;

/// 归一化用户输入：去掉空白和连字符
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// HOTP (RFC 4226) 动态截断
fn hotp(secret: &[u8], counter: u64) -> u32 {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret);
    let tag = hmac::sign(&key, &counter.to_be_bytes());
    let bytes = tag.as_ref();
    let offset = (bytes[bytes.len() - 1] & 0x0f) as usize;
    let code = ((bytes[offset] as u32 & 0x7f) << 24)
        | ((bytes[offset + 1] as u32) << 16)
        | ((bytes[offset + 2] as u32) << 8)
        | (bytes[offset + 3] as u32);
    code % 10u32.pow(TOTP_DIGITS)
}

/// 给定时刻的 TOTP 码
pub fn totp_at(secret: &[u8], time_millis: i64) -> String {
    let counter = (time_millis / 1000 / TOTP_STEP_SECS) as u64;
    format!("{:06}", hotp(secret, counter))
}

/// 校验 TOTP 码，允许 ±[`TOTP_SKEW_STEPS`] 步
pub fn verify_totp(secret: &[u8], code: &str, now_millis: i64) -> bool {
    let normalized = normalize_code(code);
    if normalized.len() != TOTP_DIGITS as usize {
        return false;
    }

    let current_step = now_millis / 1000 / TOTP_STEP_SECS;
    for skew in -TOTP_SKEW_STEPS..=TOTP_SKEW_STEPS {
        let step = current_step + skew;
        if step < 0 {
            continue;
        }
        let candidate = format!("{:06}", hotp(secret, step as u64));
        if constant_time_eq(candidate.as_bytes(), normalized.as_bytes()) {
            return true;
        }
    }
    false
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}

/// 认证加密封箱
///
/// 存储格式: base64(nonce[12] || ciphertext || tag[16])
pub struct SecretBox {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SecretBox {
    /// 从 hex 编码的 32 字节密钥构造
    pub fn from_hex(hex_key: &str) -> Result<Self, AppError> {
        let key_bytes = hex::decode(hex_key)
            .map_err(|_| AppError::internal("TWO_FACTOR_KEY is not valid hex"))?;
        let unbound = UnboundKey::new(&CHACHA20_POLY1305, &key_bytes)
            .map_err(|_| AppError::internal("TWO_FACTOR_KEY must be 32 bytes"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// 密封明文，每次调用使用新的随机 nonce
    pub fn seal(&self, plaintext: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::internal("Failed to generate nonce"))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AppError::internal("Failed to seal secret"))?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&in_out);
        Ok(BASE64.encode(blob))
    }

    /// 开箱。任何格式或认证失败都是配置错误，不是"码不对"。
    pub fn open(&self, sealed: &str) -> Result<String, AppError> {
        let blob = BASE64
            .decode(sealed)
            .map_err(|_| AppError::internal("Sealed secret is not valid base64"))?;
        if blob.len() <= NONCE_LEN {
            return Err(AppError::internal("Sealed secret is truncated"));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::internal("Sealed secret has malformed nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AppError::internal("Failed to open sealed secret"))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AppError::internal("Sealed secret is not valid UTF-8"))
    }
}

impl std::fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBox").finish_non_exhaustive()
    }
}

/// 第二因子校验器
#[derive(Debug)]
pub struct TwoFactorVerifier {
    secret_box: SecretBox,
}

impl TwoFactorVerifier {
    pub fn new(hex_key: &str) -> Result<Self, AppError> {
        Ok(Self {
            secret_box: SecretBox::from_hex(hex_key)?,
        })
    }

    /// 生成新的 TOTP 秘密，返回 (明文 hex, 密封形式)
    pub fn generate_secret(&self) -> Result<(String, String), AppError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; SECRET_LEN];
        rng.fill(&mut bytes)
            .map_err(|_| AppError::internal("Failed to generate TOTP secret"))?;
        let plain = hex::encode(bytes);
        let sealed = self.secret_box.seal(&plain)?;
        Ok((plain, sealed))
    }

    /// 生成一批一次性备用码，返回 (明文, 密封形式)
    pub fn generate_backup_codes(&self) -> Result<(Vec<String>, Vec<String>), AppError> {
        let rng = SystemRandom::new();
        let mut plain = Vec::with_capacity(BACKUP_CODE_COUNT);
        let mut sealed = Vec::with_capacity(BACKUP_CODE_COUNT);
        for _ in 0..BACKUP_CODE_COUNT {
            let mut bytes = [0u8; 5];
            rng.fill(&mut bytes)
                .map_err(|_| AppError::internal("Failed to generate backup code"))?;
            let raw = hex::encode(bytes);
            let code = format!("{}-{}", &raw[..5], &raw[5..]);
            sealed.push(self.secret_box.seal(&code)?);
            plain.push(code);
        }
        Ok((plain, sealed))
    }

    /// 校验第二因子
    ///
    /// 返回值:
    /// - `Ok(None)` — TOTP 命中，设置无需变更
    /// - `Ok(Some(updated))` — 备用码命中并已消费，调用方持久化新设置
    /// - `Err(InvalidSecondFactor)` — 码错误
    /// - `Err(Internal)` — 密钥/密文配置问题
    pub fn verify(
        &self,
        settings: &SecuritySettings,
        code: &str,
        now_millis: i64,
    ) -> Result<Option<SecuritySettings>, AppError> {
        let sealed_secret = settings
            .totp_secret
            .as_ref()
            .ok_or_else(|| AppError::internal("2FA enabled but no secret enrolled"))?;

        // 1. TOTP 主通道
        let secret_hex = self.secret_box.open(sealed_secret)?;
        let secret = hex::decode(&secret_hex)
            .map_err(|_| AppError::internal("Stored TOTP secret is not valid hex"))?;
        if verify_totp(&secret, code, now_millis) {
            return Ok(None);
        }

        // 2. 备用码回退 — 命中即消费
        let normalized = normalize_code(code);
        for (idx, sealed_code) in settings.backup_codes.iter().enumerate() {
            let candidate = normalize_code(&self.secret_box.open(sealed_code)?);
            if constant_time_eq(candidate.as_bytes(), normalized.as_bytes()) {
                let mut updated = settings.clone();
                updated.backup_codes.remove(idx);
                return Ok(Some(updated));
            }
        }

        Err(AppError::InvalidSecondFactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "dev-only-tempo-2fa-key-32bytes!!" as hex
    const TEST_KEY: &str = "6465762d6f6e6c792d74656d706f2d3266612d6b65792d333262797465732121";

    #[test]
    fn seal_open_round_trip_uses_fresh_nonces() {
        let sb = SecretBox::from_hex(TEST_KEY).unwrap();
        let sealed_a = sb.seal("hello").unwrap();
        let sealed_b = sb.seal("hello").unwrap();
        // Random nonce per seal — same plaintext, different blobs
        assert_ne!(sealed_a, sealed_b);
        assert_eq!(sb.open(&sealed_a).unwrap(), "hello");
        assert_eq!(sb.open(&sealed_b).unwrap(), "hello");
    }

    #[test]
    fn open_with_wrong_key_is_config_error() {
        let sb = SecretBox::from_hex(TEST_KEY).unwrap();
        let sealed = sb.seal("hello").unwrap();

        let other_key = "00000000000000000000000000000000000000000000000000000000000000ff";
        let other = SecretBox::from_hex(other_key).unwrap();
        match other.open(&sealed) {
            Err(AppError::Internal(_)) => {}
            other => panic!("expected Internal error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn totp_matches_rfc6238_sha1_vector() {
        // RFC 6238 test secret, T = 59s → 8-digit 94287082, 6-digit 287082
        let secret = b"12345678901234567890";
        assert_eq!(totp_at(secret, 59_000), "287082");
        assert!(verify_totp(secret, "287082", 59_000));
        assert!(verify_totp(secret, " 28-70-82 ", 59_000)); // normalization
    }

    #[test]
    fn totp_tolerates_two_steps_of_drift() {
        let secret = b"12345678901234567890";
        let now = 10_000_000_000; // arbitrary
        let stale = totp_at(secret, now - 2 * TOTP_STEP_SECS * 1000);
        let too_stale = totp_at(secret, now - 3 * TOTP_STEP_SECS * 1000);
        assert!(verify_totp(secret, &stale, now));
        assert!(!verify_totp(secret, &too_stale, now));
    }

    #[test]
    fn backup_code_is_single_use() {
        let verifier = TwoFactorVerifier::new(TEST_KEY).unwrap();
        let (_, sealed_secret) = verifier.generate_secret().unwrap();
        let (plain_codes, sealed_codes) = verifier.generate_backup_codes().unwrap();

        let settings = SecuritySettings {
            two_factor_enabled: true,
            totp_secret: Some(sealed_secret),
            backup_codes: sealed_codes,
            ..Default::default()
        };

        let used = &plain_codes[2];
        let updated = verifier
            .verify(&settings, used, 0)
            .unwrap()
            .expect("backup code hit must consume");
        assert_eq!(updated.backup_codes.len(), BACKUP_CODE_COUNT - 1);

        // Replay against the updated settings fails
        assert!(matches!(
            verifier.verify(&updated, used, 0),
            Err(AppError::InvalidSecondFactor)
        ));
    }

    #[test]
    fn wrong_code_is_invalid_not_internal() {
        let verifier = TwoFactorVerifier::new(TEST_KEY).unwrap();
        let (_, sealed_secret) = verifier.generate_secret().unwrap();
        let settings = SecuritySettings {
            two_factor_enabled: true,
            totp_secret: Some(sealed_secret),
            ..Default::default()
        };
        assert!(matches!(
            verifier.verify(&settings, "000000", 0),
            Err(AppError::InvalidSecondFactor)
        ));
    }
}
