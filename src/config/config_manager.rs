// ==========================================
// 仓储运营后台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::types::QuantityType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ===== 配置键 =====
pub const KEY_ALLOC_LOCK_TIMEOUT_MS: &str = "alloc_lock_timeout_ms";
pub const KEY_BATCH_CODE_PREFIX: &str = "batch_code_prefix";
pub const KEY_DEFAULT_QUANTITY_TYPE: &str = "default_quantity_type";

// ===== 默认值 =====
const DEFAULT_ALLOC_LOCK_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_BATCH_CODE_PREFIX: &str = "RPL";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?, ?, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = datetime('now')"#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 列出 global scope 的全部配置
    pub fn list_configs(&self) -> RepositoryResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let configs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;

        Ok(configs)
    }

    // ==========================================
    // 类型化读取 (带默认值)
    // ==========================================

    /// 横持充当命名锁的等待超时 (毫秒, 默认 1000)
    pub fn alloc_lock_timeout_ms(&self) -> RepositoryResult<u64> {
        let raw = self.get_config_value(KEY_ALLOC_LOCK_TIMEOUT_MS)?;
        Ok(raw
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_ALLOC_LOCK_TIMEOUT_MS))
    }

    /// 批次代码前缀 (默认 "RPL")
    pub fn batch_code_prefix(&self) -> RepositoryResult<String> {
        let raw = self.get_config_value(KEY_BATCH_CODE_PREFIX)?;
        Ok(raw.unwrap_or_else(|| DEFAULT_BATCH_CODE_PREFIX.to_string()))
    }

    /// 候补默认数量区分 (默认 PIECE)
    pub fn default_quantity_type(&self) -> RepositoryResult<QuantityType> {
        let raw = self.get_config_value(KEY_DEFAULT_QUANTITY_TYPE)?;
        Ok(raw
            .map(|s| QuantityType::from_db_str(&s))
            .unwrap_or(QuantityType::Piece))
    }
}
