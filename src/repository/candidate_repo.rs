// ==========================================
// 仓储运营后台 - 补货候补仓储
// ==========================================
// 并发控制: 单条变更一律走 lock_version 条件更新 (乐观锁);
// 批量审批按 batch_code + 现状态整体更新, 不持跨请求的锁
// ==========================================

use crate::domain::candidate::ReplenishCandidate;
use crate::domain::types::{CandidateStatus, CandidateType, LotFeeType, QuantityType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"candidate_id, batch_code, candidate_type, warehouse_id, item_id,
       source_contractor_id, source_warehouse_id,
       self_shortage_qty, upstream_demand_qty, suggested_qty, order_qty,
       quantity_type, expected_arrival_date, status, exclusion_reason,
       lot_before_qty, lot_after_qty, lot_fee_type, lot_fee_amount,
       is_manually_modified, modified_by, modified_at, lock_version,
       created_at, transmitted_at, executed_at"#;

// ==========================================
// CandidateRepository - 补货候补仓储
// ==========================================
pub struct CandidateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CandidateRepository {
    /// 创建新的 CandidateRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量写入候补 (单事务)
    ///
    /// # 红线
    /// - 计算器只在全量计算成功后调用本方法; 中途失败的运行不得留下部分候补
    pub fn insert_batch(&self, candidates: &[ReplenishCandidate]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO replenish_candidate (
                    candidate_id, batch_code, candidate_type, warehouse_id, item_id,
                    source_contractor_id, source_warehouse_id,
                    self_shortage_qty, upstream_demand_qty, suggested_qty, order_qty,
                    quantity_type, expected_arrival_date, status, exclusion_reason,
                    lot_before_qty, lot_after_qty, lot_fee_type, lot_fee_amount,
                    is_manually_modified, modified_by, modified_at, lock_version, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for c in candidates {
                stmt.execute(params![
                    &c.candidate_id,
                    &c.batch_code,
                    c.candidate_type.to_db_str(),
                    &c.warehouse_id,
                    &c.item_id,
                    &c.source_contractor_id,
                    &c.source_warehouse_id,
                    c.self_shortage_qty,
                    c.upstream_demand_qty,
                    c.suggested_qty,
                    c.order_qty,
                    c.quantity_type.to_db_str(),
                    &c.expected_arrival_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    c.status.to_db_str(),
                    &c.exclusion_reason,
                    &c.lot_before_qty,
                    &c.lot_after_qty,
                    &c.lot_fee_type.map(|t| t.to_db_str()),
                    &c.lot_fee_amount,
                    c.is_manually_modified as i64,
                    &c.modified_by,
                    &c.modified_at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                    c.lock_version,
                    c.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(candidates.len())
    }

    /// 按ID查询候补
    pub fn find_by_id(&self, candidate_id: &str) -> RepositoryResult<Option<ReplenishCandidate>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "SELECT {} FROM replenish_candidate WHERE candidate_id = ?",
                SELECT_COLUMNS
            ),
            params![candidate_id],
            |row| Self::map_row(row),
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询一个批次的全部候补
    pub fn find_by_batch(&self, batch_code: &str) -> RepositoryResult<Vec<ReplenishCandidate>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM replenish_candidate
               WHERE batch_code = ?
               ORDER BY candidate_type, warehouse_id, item_id"#,
            SELECT_COLUMNS
        ))?;

        let candidates = stmt
            .query_map(params![batch_code], |row| Self::map_row(row))?
            .collect::<Result<Vec<ReplenishCandidate>, _>>()?;

        Ok(candidates)
    }

    /// 批量状态迁移 (batch_code 范围, 仅命中指定现状态的行)
    ///
    /// # 参数
    /// - `exclusion_reason`: 迁移到 EXCLUDED 时必填, 其他迁移传 None
    ///
    /// # 返回
    /// - `Ok(count)`: 实际迁移的行数 (0 行不算错误; 没有待处理行也是合法情形)
    pub fn bulk_update_status(
        &self,
        batch_code: &str,
        from: CandidateStatus,
        to: CandidateStatus,
        exclusion_reason: Option<&str>,
        operator: &str,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE replenish_candidate
               SET status = ?,
                   exclusion_reason = ?,
                   modified_by = ?,
                   modified_at = datetime('now'),
                   lock_version = lock_version + 1
               WHERE batch_code = ? AND status = ?"#,
            params![
                to.to_db_str(),
                exclusion_reason,
                operator,
                batch_code,
                from.to_db_str()
            ],
        )?;

        Ok(rows)
    }

    /// 条件更新候补 (乐观锁)
    ///
    /// 以 `candidate.lock_version` 为期望版本执行条件更新; 成功后版本号 +1。
    /// 可变更字段: order_qty / quantity_type / expected_arrival_date / status / exclusion_reason。
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: 版本不匹配 (其他操作员已更新, 调用方须重取重试)
    /// - `RepositoryError::NotFound`: candidate_id 不存在
    pub fn update_with_version(&self, candidate: &ReplenishCandidate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE replenish_candidate
               SET order_qty = ?,
                   quantity_type = ?,
                   expected_arrival_date = ?,
                   status = ?,
                   exclusion_reason = ?,
                   is_manually_modified = 1,
                   modified_by = ?,
                   modified_at = datetime('now'),
                   lock_version = lock_version + 1
               WHERE candidate_id = ? AND lock_version = ?"#,
            params![
                candidate.order_qty,
                candidate.quantity_type.to_db_str(),
                &candidate.expected_arrival_date.map(|d| d.format("%Y-%m-%d").to_string()),
                candidate.status.to_db_str(),
                &candidate.exclusion_reason,
                &candidate.modified_by,
                &candidate.candidate_id,
                candidate.lock_version,
            ],
        )?;

        // 0 行命中: 区分记录不存在与版本冲突
        if rows_affected == 0 {
            let exists: Result<i64, _> = conn.query_row(
                "SELECT lock_version FROM replenish_candidate WHERE candidate_id = ?",
                params![&candidate.candidate_id],
                |row| row.get(0),
            );

            match exists {
                Ok(actual_version) => {
                    return Err(RepositoryError::OptimisticLockFailure {
                        candidate_id: candidate.candidate_id.clone(),
                        expected: candidate.lock_version,
                        actual: actual_version,
                    });
                }
                Err(_) => {
                    return Err(RepositoryError::NotFound {
                        entity: "ReplenishCandidate".to_string(),
                        id: candidate.candidate_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// 查询已确定且未送信的候补 (送信协作方的取件口)
    pub fn find_confirmed_untransmitted(&self) -> RepositoryResult<Vec<ReplenishCandidate>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM replenish_candidate
               WHERE status = 'CONFIRMED' AND transmitted_at IS NULL
               ORDER BY batch_code, warehouse_id, item_id"#,
            SELECT_COLUMNS
        ))?;

        let candidates = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<ReplenishCandidate>, _>>()?;

        Ok(candidates)
    }

    /// 标记送信完了 (仅命中 CONFIRMED 行)
    pub fn mark_transmitted(&self, candidate_ids: &[String]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut total = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"UPDATE replenish_candidate
                   SET transmitted_at = datetime('now'),
                       lock_version = lock_version + 1
                   WHERE candidate_id = ? AND status = 'CONFIRMED'"#,
            )?;

            for id in candidate_ids {
                total += stmt.execute(params![id])?;
            }
        }

        tx.commit()?;
        Ok(total)
    }

    /// 标记执行完了 (送信协作方回执: CONFIRMED → EXECUTED)
    ///
    /// # 错误
    /// - `RepositoryError::InvalidStateTransition`: 当前状态不是 CONFIRMED
    pub fn mark_executed(&self, candidate_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE replenish_candidate
               SET status = 'EXECUTED',
                   executed_at = datetime('now'),
                   lock_version = lock_version + 1
               WHERE candidate_id = ? AND status = 'CONFIRMED'"#,
            params![candidate_id],
        )?;

        if rows == 0 {
            let current: Result<String, _> = conn.query_row(
                "SELECT status FROM replenish_candidate WHERE candidate_id = ?",
                params![candidate_id],
                |row| row.get(0),
            );

            return match current {
                Ok(status) => Err(RepositoryError::InvalidStateTransition {
                    from: status,
                    to: "EXECUTED".to_string(),
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "ReplenishCandidate".to_string(),
                    id: candidate_id.to_string(),
                }),
            };
        }

        Ok(())
    }

    /// 映射数据库行到 ReplenishCandidate
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ReplenishCandidate> {
        let candidate_type_str: String = row.get(2)?;
        let candidate_type = CandidateType::from_db_str(&candidate_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知的 candidate_type: {}", candidate_type_str).into(),
            )
        })?;

        let quantity_type_str: String = row.get(11)?;
        let status_str: String = row.get(13)?;
        let lot_fee_type_str: Option<String> = row.get(17)?;

        Ok(ReplenishCandidate {
            candidate_id: row.get(0)?,
            batch_code: row.get(1)?,
            candidate_type,
            warehouse_id: row.get(3)?,
            item_id: row.get(4)?,
            source_contractor_id: row.get(5)?,
            source_warehouse_id: row.get(6)?,
            self_shortage_qty: row.get(7)?,
            upstream_demand_qty: row.get(8)?,
            suggested_qty: row.get(9)?,
            order_qty: row.get(10)?,
            quantity_type: QuantityType::from_db_str(&quantity_type_str),
            expected_arrival_date: row
                .get::<_, Option<String>>(12)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            status: CandidateStatus::from_db_str(&status_str),
            exclusion_reason: row.get(14)?,
            lot_before_qty: row.get(15)?,
            lot_after_qty: row.get(16)?,
            lot_fee_type: lot_fee_type_str.map(|s| LotFeeType::from_db_str(&s)),
            lot_fee_amount: row.get(18)?,
            is_manually_modified: row.get::<_, i64>(19)? != 0,
            modified_by: row.get(20)?,
            modified_at: row
                .get::<_, Option<String>>(21)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            lock_version: row.get(22)?,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(23)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(23, rusqlite::types::Type::Text, Box::new(e))
            })?,
            transmitted_at: row
                .get::<_, Option<String>>(24)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            executed_at: row
                .get::<_, Option<String>>(25)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
        })
    }
}
