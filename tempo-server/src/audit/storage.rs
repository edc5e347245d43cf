//! 审计日志存储
//!
//! SQLite 上的追加写存储。条目只 INSERT，永不 UPDATE/DELETE；
//! `prev_hash`/`curr_hash` 组成 SHA256 链，任何事后篡改都会破坏链。

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;

use super::types::{AuditAction, AuditChainVerification, AuditEntry, AuditQuery};

/// 链首哨兵值
const GENESIS_HASH: &str = "genesis";

#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Audit storage database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AuditStorageError {
    fn from(err: sqlx::Error) -> Self {
        AuditStorageError::Database(err.to_string())
    }
}

/// 审计日志存储
#[derive(Clone)]
pub struct AuditStorage {
    pool: SqlitePool,
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 计算记录哈希（串接 prev_hash 与全部字段）
    fn compute_hash(
        prev_hash: &str,
        timestamp: i64,
        action: AuditAction,
        account_id: Option<i64>,
        ip: Option<&str>,
        user_agent: Option<&str>,
        message: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(timestamp.to_be_bytes());
        hasher.update(action.to_string().as_bytes());
        hasher.update(account_id.unwrap_or(0).to_be_bytes());
        hasher.update(ip.unwrap_or("").as_bytes());
        hasher.update(user_agent.unwrap_or("").as_bytes());
        hasher.update(message.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// 追加一条审计记录
    pub async fn append(
        &self,
        timestamp: i64,
        action: AuditAction,
        account_id: Option<i64>,
        ip: Option<String>,
        user_agent: Option<String>,
        message: String,
    ) -> Result<AuditEntry, AuditStorageError> {
        let prev_hash: String =
            sqlx::query_scalar("SELECT curr_hash FROM audit_log ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?
                .unwrap_or_else(|| GENESIS_HASH.to_string());

        let curr_hash = Self::compute_hash(
            &prev_hash,
            timestamp,
            action,
            account_id,
            ip.as_deref(),
            user_agent.as_deref(),
            &message,
        );

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO audit_log (timestamp, action, account_id, ip, user_agent, message, \
             prev_hash, curr_hash) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(timestamp)
        .bind(action)
        .bind(account_id)
        .bind(&ip)
        .bind(&user_agent)
        .bind(&message)
        .bind(&prev_hash)
        .bind(&curr_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(AuditEntry {
            id,
            timestamp,
            action,
            account_id,
            ip,
            user_agent,
            message,
            prev_hash,
            curr_hash,
        })
    }

    /// 查询审计日志（按时间倒序）
    pub async fn query(
        &self,
        q: &AuditQuery,
    ) -> Result<(Vec<AuditEntry>, i64), AuditStorageError> {
        let mut conditions = vec!["1 = 1".to_string()];
        if q.from.is_some() {
            conditions.push("timestamp >= ?".into());
        }
        if q.to.is_some() {
            conditions.push("timestamp <= ?".into());
        }
        if q.action.is_some() {
            conditions.push("action = ?".into());
        }
        if q.account_id.is_some() {
            conditions.push("account_id = ?".into());
        }
        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM audit_log WHERE {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(from) = q.from {
            count_query = count_query.bind(from);
        }
        if let Some(to) = q.to {
            count_query = count_query.bind(to);
        }
        if let Some(action) = q.action {
            count_query = count_query.bind(action);
        }
        if let Some(account_id) = q.account_id {
            count_query = count_query.bind(account_id);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT id, timestamp, action, account_id, ip, user_agent, message, prev_hash, \
             curr_hash FROM audit_log WHERE {where_clause} \
             ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query_as::<_, AuditEntry>(&list_sql);
        if let Some(from) = q.from {
            list_query = list_query.bind(from);
        }
        if let Some(to) = q.to {
            list_query = list_query.bind(to);
        }
        if let Some(action) = q.action {
            list_query = list_query.bind(action);
        }
        if let Some(account_id) = q.account_id {
            list_query = list_query.bind(account_id);
        }
        let items = list_query.bind(q.limit).bind(q.offset).fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    /// 验证哈希链完整性
    pub async fn verify_chain(&self) -> Result<AuditChainVerification, AuditStorageError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, timestamp, action, account_id, ip, user_agent, message, prev_hash, \
             curr_hash FROM audit_log ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut breaks = Vec::new();
        let mut expected_prev = GENESIS_HASH.to_string();

        for entry in &entries {
            let recomputed = Self::compute_hash(
                &entry.prev_hash,
                entry.timestamp,
                entry.action,
                entry.account_id,
                entry.ip.as_deref(),
                entry.user_agent.as_deref(),
                &entry.message,
            );
            if entry.prev_hash != expected_prev || entry.curr_hash != recomputed {
                breaks.push(entry.id);
            }
            expected_prev = entry.curr_hash.clone();
        }

        Ok(AuditChainVerification {
            total_entries: entries.len() as i64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}
