// ==========================================
// 仓储运营后台 - 供给设定仓储
// ==========================================

use crate::domain::supply::SupplyEdge;
use crate::domain::types::SupplyType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SupplySettingRepository - 供给设定仓储
// ==========================================
pub struct SupplySettingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SupplySettingRepository {
    /// 创建新的 SupplySettingRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记/更新供给设定 ((warehouse_id, item_id) 唯一)
    pub fn upsert(&self, edge: &SupplyEdge) -> RepositoryResult<()> {
        edge.validate_source()
            .map_err(RepositoryError::ValidationError)?;

        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO supply_setting (
                setting_id, warehouse_id, item_id, supply_type,
                source_contractor_id, source_warehouse_id,
                lead_time_days, daily_consumption_qty, hierarchy_level,
                safety_stock_qty, max_stock_qty, enabled, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(warehouse_id, item_id) DO UPDATE SET
                supply_type = excluded.supply_type,
                source_contractor_id = excluded.source_contractor_id,
                source_warehouse_id = excluded.source_warehouse_id,
                lead_time_days = excluded.lead_time_days,
                daily_consumption_qty = excluded.daily_consumption_qty,
                hierarchy_level = excluded.hierarchy_level,
                safety_stock_qty = excluded.safety_stock_qty,
                max_stock_qty = excluded.max_stock_qty,
                enabled = excluded.enabled,
                updated_at = datetime('now')"#,
            params![
                &edge.setting_id,
                &edge.warehouse_id,
                &edge.item_id,
                edge.supply_type.to_db_str(),
                &edge.source_contractor_id,
                &edge.source_warehouse_id,
                edge.lead_time_days,
                edge.daily_consumption_qty,
                edge.hierarchy_level,
                edge.safety_stock_qty,
                edge.max_stock_qty,
                edge.enabled as i64,
            ],
        )?;

        Ok(())
    }

    /// 查询全部启用的供给边
    pub fn find_enabled(&self) -> RepositoryResult<Vec<SupplyEdge>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT setting_id, warehouse_id, item_id, supply_type,
                      source_contractor_id, source_warehouse_id,
                      lead_time_days, daily_consumption_qty, hierarchy_level,
                      safety_stock_qty, max_stock_qty, enabled
               FROM supply_setting
               WHERE enabled = 1
               ORDER BY hierarchy_level, warehouse_id, item_id"#,
        )?;

        let edges = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<SupplyEdge>, _>>()?;

        Ok(edges)
    }

    /// 按 (仓库, 商品) 查询供给设定
    pub fn find_by_key(
        &self,
        warehouse_id: &str,
        item_id: &str,
    ) -> RepositoryResult<Option<SupplyEdge>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT setting_id, warehouse_id, item_id, supply_type,
                      source_contractor_id, source_warehouse_id,
                      lead_time_days, daily_consumption_qty, hierarchy_level,
                      safety_stock_qty, max_stock_qty, enabled
               FROM supply_setting
               WHERE warehouse_id = ? AND item_id = ?"#,
            params![warehouse_id, item_id],
            |row| Self::map_row(row),
        ) {
            Ok(edge) => Ok(Some(edge)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到 SupplyEdge
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SupplyEdge> {
        let supply_type_str: String = row.get(3)?;
        let supply_type = SupplyType::from_db_str(&supply_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("未知的 supply_type: {}", supply_type_str).into(),
            )
        })?;

        Ok(SupplyEdge {
            setting_id: row.get(0)?,
            warehouse_id: row.get(1)?,
            item_id: row.get(2)?,
            supply_type,
            source_contractor_id: row.get(4)?,
            source_warehouse_id: row.get(5)?,
            lead_time_days: row.get(6)?,
            daily_consumption_qty: row.get(7)?,
            hierarchy_level: row.get(8)?,
            safety_stock_qty: row.get(9)?,
            max_stock_qty: row.get(10)?,
            enabled: row.get::<_, i64>(11)? != 0,
        })
    }
}
