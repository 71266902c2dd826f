// ==========================================
// 仓储运营后台 - 欠品/横持调拨仓储
// ==========================================
// 充当写入走单事务: 充当明细 + 供给源预占 + 欠品状态 同时成立或同时回滚
// ==========================================

use crate::domain::shortage::{Shortage, ShortageAllocation};
use crate::domain::types::{QuantityType, ShortageStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SHORTAGE_COLUMNS: &str = r#"shortage_id, warehouse_id, item_id, trade_id, trade_item_id,
       order_qty, shortage_qty, qty_type_at_order, source_pick_result_id,
       status, confirmed_by, confirmed_at, created_at"#;

const ALLOCATION_COLUMNS: &str = r#"allocation_id, shortage_id, source_warehouse_id, target_warehouse_id,
       item_id, assign_qty, assign_qty_type, is_finished, finished_by, finished_at, created_at"#;

// ==========================================
// ShortageRepository - 欠品仓储
// ==========================================
pub struct ShortageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShortageRepository {
    /// 创建新的 ShortageRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记欠品 (拣货子系统的受け口)
    pub fn create(&self, shortage: &Shortage) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO shortage (
                shortage_id, warehouse_id, item_id, trade_id, trade_item_id,
                order_qty, shortage_qty, qty_type_at_order, source_pick_result_id,
                status, confirmed_by, confirmed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &shortage.shortage_id,
                &shortage.warehouse_id,
                &shortage.item_id,
                &shortage.trade_id,
                &shortage.trade_item_id,
                shortage.order_qty,
                shortage.shortage_qty,
                shortage.qty_type_at_order.to_db_str(),
                &shortage.source_pick_result_id,
                shortage.status.to_db_str(),
                &shortage.confirmed_by,
                &shortage.confirmed_at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                shortage.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(shortage.shortage_id.clone())
    }

    /// 按ID查询欠品
    pub fn find_by_id(&self, shortage_id: &str) -> RepositoryResult<Option<Shortage>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {} FROM shortage WHERE shortage_id = ?", SHORTAGE_COLUMNS),
            params![shortage_id],
            |row| Self::map_shortage_row(row),
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询欠品的全部充当明细
    pub fn find_allocations(&self, shortage_id: &str) -> RepositoryResult<Vec<ShortageAllocation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM shortage_allocation
               WHERE shortage_id = ?
               ORDER BY created_at, allocation_id"#,
            ALLOCATION_COLUMNS
        ))?;

        let allocations = stmt
            .query_map(params![shortage_id], |row| Self::map_allocation_row(row))?
            .collect::<Result<Vec<ShortageAllocation>, _>>()?;

        Ok(allocations)
    }

    /// 按ID查询充当明细
    pub fn find_allocation_by_id(
        &self,
        allocation_id: &str,
    ) -> RepositoryResult<Option<ShortageAllocation>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "SELECT {} FROM shortage_allocation WHERE allocation_id = ?",
                ALLOCATION_COLUMNS
            ),
            params![allocation_id],
            |row| Self::map_allocation_row(row),
        ) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 欠品的充当数量合计
    pub fn sum_assigned(&self, shortage_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;

        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(assign_qty), 0) FROM shortage_allocation WHERE shortage_id = ?",
            params![shortage_id],
            |row| row.get(0),
        )?;

        Ok(total)
    }

    /// 写入一批充当明细 (单事务: 明细 + 供给源预占 + 欠品状态)
    ///
    /// # 红线
    /// - 供给源预占带有效在库条件 (on_hand - reserved >= assign_qty);
    ///   条件不成立说明分配决策与实时库存已脱节, 整个事务回滚
    pub fn apply_allocations(
        &self,
        shortage_id: &str,
        allocations: &[ShortageAllocation],
        new_status: ShortageStatus,
        operator: &str,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for a in allocations {
            tx.execute(
                r#"INSERT INTO shortage_allocation (
                    allocation_id, shortage_id, source_warehouse_id, target_warehouse_id,
                    item_id, assign_qty, assign_qty_type, is_finished, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)"#,
                params![
                    &a.allocation_id,
                    &a.shortage_id,
                    &a.source_warehouse_id,
                    &a.target_warehouse_id,
                    &a.item_id,
                    a.assign_qty,
                    a.assign_qty_type.to_db_str(),
                    a.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ],
            )?;

            // 供给源预占
            let reserved = tx.execute(
                r#"UPDATE warehouse_stock
                   SET reserved_qty = reserved_qty + ?1,
                       updated_at = datetime('now')
                   WHERE warehouse_id = ?2 AND item_id = ?3
                     AND on_hand_qty - reserved_qty >= ?1"#,
                params![a.assign_qty, &a.source_warehouse_id, &a.item_id],
            )?;

            if reserved == 0 {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "供给源在库不足, 预占失败: warehouse={} item={} assign={}",
                    a.source_warehouse_id, a.item_id, a.assign_qty
                )));
            }
        }

        // 欠品状态更新 (全量充当时同时盖确认章)
        match new_status {
            ShortageStatus::Done => {
                tx.execute(
                    r#"UPDATE shortage
                       SET status = ?, confirmed_by = ?, confirmed_at = datetime('now')
                       WHERE shortage_id = ?"#,
                    params![new_status.to_db_str(), operator, shortage_id],
                )?;
            }
            _ => {
                tx.execute(
                    "UPDATE shortage SET status = ? WHERE shortage_id = ?",
                    params![new_status.to_db_str(), shortage_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 标记充当完了 (实物出库) 并扣减供给源库存
    ///
    /// # 错误
    /// - `RepositoryError::InvalidStateTransition`: 充当已是完了状态
    pub fn finish_allocation(
        &self,
        allocation_id: &str,
        operator: &str,
    ) -> RepositoryResult<ShortageAllocation> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE shortage_allocation
               SET is_finished = 1, finished_by = ?, finished_at = datetime('now')
               WHERE allocation_id = ? AND is_finished = 0"#,
            params![operator, allocation_id],
        )?;

        if rows == 0 {
            let exists: Result<i64, _> = tx.query_row(
                "SELECT is_finished FROM shortage_allocation WHERE allocation_id = ?",
                params![allocation_id],
                |row| row.get(0),
            );

            return match exists {
                Ok(_) => Err(RepositoryError::InvalidStateTransition {
                    from: "FINISHED".to_string(),
                    to: "FINISHED".to_string(),
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "ShortageAllocation".to_string(),
                    id: allocation_id.to_string(),
                }),
            };
        }

        let allocation = tx.query_row(
            &format!(
                "SELECT {} FROM shortage_allocation WHERE allocation_id = ?",
                ALLOCATION_COLUMNS
            ),
            params![allocation_id],
            |row| Self::map_allocation_row(row),
        )?;

        // 实物已出库: 解除预占并扣减在库
        tx.execute(
            r#"UPDATE warehouse_stock
               SET on_hand_qty = on_hand_qty - ?1,
                   reserved_qty = reserved_qty - ?1,
                   updated_at = datetime('now')
               WHERE warehouse_id = ?2 AND item_id = ?3"#,
            params![
                allocation.assign_qty,
                &allocation.source_warehouse_id,
                &allocation.item_id
            ],
        )?;

        tx.commit()?;
        Ok(allocation)
    }

    /// 欠品的充当是否全部完了
    pub fn all_allocations_finished(&self, shortage_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let (total, finished): (i64, i64) = conn.query_row(
            r#"SELECT COUNT(*),
                      COALESCE(SUM(CASE WHEN is_finished = 1 THEN 1 ELSE 0 END), 0)
               FROM shortage_allocation
               WHERE shortage_id = ?"#,
            params![shortage_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(total > 0 && total == finished)
    }

    /// 欠品的完了充当数量合计
    pub fn sum_finished_assigned(&self, shortage_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;

        let total: f64 = conn.query_row(
            r#"SELECT COALESCE(SUM(assign_qty), 0)
               FROM shortage_allocation
               WHERE shortage_id = ? AND is_finished = 1"#,
            params![shortage_id],
            |row| row.get(0),
        )?;

        Ok(total)
    }

    /// 映射数据库行到 Shortage
    fn map_shortage_row(row: &rusqlite::Row) -> rusqlite::Result<Shortage> {
        let qty_type_str: String = row.get(7)?;
        let status_str: String = row.get(9)?;

        Ok(Shortage {
            shortage_id: row.get(0)?,
            warehouse_id: row.get(1)?,
            item_id: row.get(2)?,
            trade_id: row.get(3)?,
            trade_item_id: row.get(4)?,
            order_qty: row.get(5)?,
            shortage_qty: row.get(6)?,
            qty_type_at_order: QuantityType::from_db_str(&qty_type_str),
            source_pick_result_id: row.get(8)?,
            status: ShortageStatus::from_db_str(&status_str),
            confirmed_by: row.get(10)?,
            confirmed_at: row
                .get::<_, Option<String>>(11)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(12)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
            })?,
        })
    }

    /// 映射数据库行到 ShortageAllocation
    fn map_allocation_row(row: &rusqlite::Row) -> rusqlite::Result<ShortageAllocation> {
        let qty_type_str: String = row.get(6)?;

        Ok(ShortageAllocation {
            allocation_id: row.get(0)?,
            shortage_id: row.get(1)?,
            source_warehouse_id: row.get(2)?,
            target_warehouse_id: row.get(3)?,
            item_id: row.get(4)?,
            assign_qty: row.get(5)?,
            assign_qty_type: QuantityType::from_db_str(&qty_type_str),
            is_finished: row.get::<_, i64>(7)? != 0,
            finished_by: row.get(8)?,
            finished_at: row
                .get::<_, Option<String>>(9)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(10)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
            })?,
        })
    }
}
