// ==========================================
// 仓储运营后台 - 数量订正出队仓储
// ==========================================
// request_id (= 拣货实绩ID) 唯一; 重复入队按 no-op 处理, 与下游收件方的幂等约定一致
// ==========================================

use crate::domain::shortage::QuantityCorrection;
use crate::domain::types::{CorrectionStatus, QuantityType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"correction_id, request_id, trade_id, trade_item_id,
       update_qty, quantity_type, status, created_at, sent_at"#;

// ==========================================
// QuantityCorrectionRepository - 订正出队仓储
// ==========================================
pub struct QuantityCorrectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QuantityCorrectionRepository {
    /// 创建新的 QuantityCorrectionRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 入队订正记录
    ///
    /// # 返回
    /// - `Ok(true)`: 新规入队
    /// - `Ok(false)`: request_id 已存在, no-op
    pub fn enqueue(
        &self,
        request_id: &str,
        trade_id: &str,
        trade_item_id: &str,
        update_qty: f64,
        quantity_type: QuantityType,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"INSERT OR IGNORE INTO quantity_correction (
                correction_id, request_id, trade_id, trade_item_id,
                update_qty, quantity_type, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'QUEUED', datetime('now'))"#,
            params![
                Uuid::new_v4().to_string(),
                request_id,
                trade_id,
                trade_item_id,
                update_qty,
                quantity_type.to_db_str(),
            ],
        )?;

        Ok(rows > 0)
    }

    /// 查询待送出的订正记录
    pub fn list_queued(&self) -> RepositoryResult<Vec<QuantityCorrection>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM quantity_correction WHERE status = 'QUEUED' ORDER BY created_at",
            SELECT_COLUMNS
        ))?;

        let corrections = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<QuantityCorrection>, _>>()?;

        Ok(corrections)
    }

    /// 标记已送出
    pub fn mark_sent(&self, request_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE quantity_correction
               SET status = 'SENT', sent_at = datetime('now')
               WHERE request_id = ? AND status = 'QUEUED'"#,
            params![request_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "QuantityCorrection".to_string(),
                id: request_id.to_string(),
            });
        }

        Ok(())
    }

    /// 按 request_id 查询
    pub fn find_by_request_id(&self, request_id: &str) -> RepositoryResult<Option<QuantityCorrection>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "SELECT {} FROM quantity_correction WHERE request_id = ?",
                SELECT_COLUMNS
            ),
            params![request_id],
            |row| Self::map_row(row),
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到 QuantityCorrection
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<QuantityCorrection> {
        let qty_type_str: String = row.get(5)?;
        let status_str: String = row.get(6)?;

        Ok(QuantityCorrection {
            correction_id: row.get(0)?,
            request_id: row.get(1)?,
            trade_id: row.get(2)?,
            trade_item_id: row.get(3)?,
            update_qty: row.get(4)?,
            quantity_type: QuantityType::from_db_str(&qty_type_str),
            status: CorrectionStatus::from_db_str(&status_str),
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(7)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
            })?,
            sent_at: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
        })
    }
}
