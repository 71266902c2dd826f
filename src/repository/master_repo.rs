// ==========================================
// 仓储运营后台 - 主数据仓储
// ==========================================
// 仓库/商品/供应商/配送便路线
// ==========================================

use crate::domain::master::{Contractor, Item, Warehouse, WarehouseRoute};
use crate::domain::types::LotFeeType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// MasterRepository - 主数据仓储
// ==========================================
pub struct MasterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MasterRepository {
    /// 创建新的 MasterRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 仓库 =====

    /// 登记/更新仓库
    pub fn upsert_warehouse(&self, warehouse: &Warehouse) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO warehouse_master (warehouse_id, warehouse_name, is_active)
               VALUES (?, ?, ?)
               ON CONFLICT(warehouse_id) DO UPDATE SET
                   warehouse_name = excluded.warehouse_name,
                   is_active = excluded.is_active"#,
            params![
                &warehouse.warehouse_id,
                &warehouse.warehouse_name,
                warehouse.is_active as i64
            ],
        )?;
        Ok(())
    }

    /// 按ID查询仓库
    pub fn find_warehouse(&self, warehouse_id: &str) -> RepositoryResult<Option<Warehouse>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            "SELECT warehouse_id, warehouse_name, is_active FROM warehouse_master WHERE warehouse_id = ?",
            params![warehouse_id],
            |row| {
                Ok(Warehouse {
                    warehouse_id: row.get(0)?,
                    warehouse_name: row.get(1)?,
                    is_active: row.get::<_, i64>(2)? != 0,
                })
            },
        ) {
            Ok(w) => Ok(Some(w)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ===== 商品 =====

    /// 登记/更新商品
    pub fn upsert_item(&self, item: &Item) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO item_master (item_id, item_name, is_active)
               VALUES (?, ?, ?)
               ON CONFLICT(item_id) DO UPDATE SET
                   item_name = excluded.item_name,
                   is_active = excluded.is_active"#,
            params![&item.item_id, &item.item_name, item.is_active as i64],
        )?;
        Ok(())
    }

    // ===== 供应商 =====

    /// 登记/更新供应商
    pub fn upsert_contractor(&self, contractor: &Contractor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO contractor_master (
                contractor_id, contractor_name, lot_unit_qty,
                lot_fee_type, lot_fee_amount, is_active
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(contractor_id) DO UPDATE SET
                contractor_name = excluded.contractor_name,
                lot_unit_qty = excluded.lot_unit_qty,
                lot_fee_type = excluded.lot_fee_type,
                lot_fee_amount = excluded.lot_fee_amount,
                is_active = excluded.is_active"#,
            params![
                &contractor.contractor_id,
                &contractor.contractor_name,
                &contractor.lot_unit_qty,
                contractor.lot_fee_type.to_db_str(),
                contractor.lot_fee_amount,
                contractor.is_active as i64,
            ],
        )?;
        Ok(())
    }

    /// 按ID查询供应商
    pub fn find_contractor(&self, contractor_id: &str) -> RepositoryResult<Option<Contractor>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            r#"SELECT contractor_id, contractor_name, lot_unit_qty,
                      lot_fee_type, lot_fee_amount, is_active
               FROM contractor_master
               WHERE contractor_id = ?"#,
            params![contractor_id],
            |row| {
                let fee_type_str: String = row.get(3)?;
                Ok(Contractor {
                    contractor_id: row.get(0)?,
                    contractor_name: row.get(1)?,
                    lot_unit_qty: row.get(2)?,
                    lot_fee_type: LotFeeType::from_db_str(&fee_type_str),
                    lot_fee_amount: row.get(4)?,
                    is_active: row.get::<_, i64>(5)? != 0,
                })
            },
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ===== 配送便路线 =====

    /// 登记/更新路线
    pub fn upsert_route(&self, route: &WarehouseRoute) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO warehouse_route (source_warehouse_id, target_warehouse_id, priority)
               VALUES (?, ?, ?)
               ON CONFLICT(source_warehouse_id, target_warehouse_id) DO UPDATE SET
                   priority = excluded.priority"#,
            params![
                &route.source_warehouse_id,
                &route.target_warehouse_id,
                route.priority
            ],
        )?;
        Ok(())
    }
}
