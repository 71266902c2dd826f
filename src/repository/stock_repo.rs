// ==========================================
// 仓储运营后台 - 实时库存仓储
// ==========================================
// warehouse_stock 为实时可变库存 (拣货/入库协作方维护);
// 批计算一律读快照, 只有缺货调拨 (实时性要求) 直接读取本表
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 实时库存行 (快照生成器的读取单位)
#[derive(Debug, Clone)]
pub struct LiveStockRow {
    pub warehouse_id: String,
    pub item_id: String,
    pub on_hand_qty: f64,
    pub reserved_qty: f64,
    pub incoming_qty: f64,
}

/// 横持供给源候补 (按配送便优先度排序返回)
#[derive(Debug, Clone)]
pub struct DonorStock {
    pub warehouse_id: String,
    pub available_qty: f64,
    pub route_priority: i64,
}

// ==========================================
// WarehouseStockRepository - 实时库存仓储
// ==========================================
pub struct WarehouseStockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WarehouseStockRepository {
    /// 创建新的 WarehouseStockRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记/更新库存行
    pub fn upsert(
        &self,
        warehouse_id: &str,
        item_id: &str,
        on_hand_qty: f64,
        reserved_qty: f64,
        incoming_qty: f64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO warehouse_stock (
                warehouse_id, item_id, on_hand_qty, reserved_qty, incoming_qty, updated_at
            ) VALUES (?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(warehouse_id, item_id) DO UPDATE SET
                on_hand_qty = excluded.on_hand_qty,
                reserved_qty = excluded.reserved_qty,
                incoming_qty = excluded.incoming_qty,
                updated_at = datetime('now')"#,
            params![warehouse_id, item_id, on_hand_qty, reserved_qty, incoming_qty],
        )?;
        Ok(())
    }

    /// 读取全部在用仓库×在用商品的库存行 (快照生成器专用)
    ///
    /// 说明: 停用仓库/停用商品的库存不进入快照, 也就不参与补货计算
    pub fn find_all_active(&self) -> RepositoryResult<Vec<LiveStockRow>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT s.warehouse_id, s.item_id, s.on_hand_qty, s.reserved_qty, s.incoming_qty
               FROM warehouse_stock s
               JOIN warehouse_master w ON w.warehouse_id = s.warehouse_id AND w.is_active = 1
               JOIN item_master i ON i.item_id = s.item_id AND i.is_active = 1
               ORDER BY s.warehouse_id, s.item_id"#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(LiveStockRow {
                    warehouse_id: row.get(0)?,
                    item_id: row.get(1)?,
                    on_hand_qty: row.get(2)?,
                    reserved_qty: row.get(3)?,
                    incoming_qty: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<LiveStockRow>, _>>()?;

        Ok(rows)
    }

    /// 按 (仓库, 商品) 查询实时有效在库数
    pub fn find_available(&self, warehouse_id: &str, item_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;

        let available: Option<f64> = conn
            .query_row(
                r#"SELECT on_hand_qty - reserved_qty
                   FROM warehouse_stock
                   WHERE warehouse_id = ? AND item_id = ?"#,
                params![warehouse_id, item_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        Ok(available.unwrap_or(0.0))
    }

    /// 查询横持供给源候补
    ///
    /// 排序: 配送便路线 priority 升序 (无路线设定的排最后), 同优先度按仓库ID
    ///
    /// # 参数
    /// - `item_id`: 欠品商品
    /// - `target_warehouse_id`: 欠品仓库 (自身除外)
    pub fn find_donors(
        &self,
        item_id: &str,
        target_warehouse_id: &str,
    ) -> RepositoryResult<Vec<DonorStock>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT s.warehouse_id,
                      s.on_hand_qty - s.reserved_qty AS available_qty,
                      COALESCE(r.priority, 9999) AS route_priority
               FROM warehouse_stock s
               JOIN warehouse_master w ON w.warehouse_id = s.warehouse_id AND w.is_active = 1
               LEFT JOIN warehouse_route r
                 ON r.source_warehouse_id = s.warehouse_id
                AND r.target_warehouse_id = ?2
               WHERE s.item_id = ?1
                 AND s.warehouse_id <> ?2
                 AND s.on_hand_qty - s.reserved_qty > 0
               ORDER BY route_priority, s.warehouse_id"#,
        )?;

        let donors = stmt
            .query_map(params![item_id, target_warehouse_id], |row| {
                Ok(DonorStock {
                    warehouse_id: row.get(0)?,
                    available_qty: row.get(1)?,
                    route_priority: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<DonorStock>, _>>()?;

        Ok(donors)
    }
}
