// ==========================================
// 仓储运营后台 - 库存快照仓储
// ==========================================
// 红线: 快照只有生成器写入, 且为"整套替换"——删除旧快照与写入新快照在同一事务内完成
// ==========================================

use crate::domain::snapshot::StockSnapshotEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// StockSnapshotRepository - 库存快照仓储
// ==========================================
pub struct StockSnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockSnapshotRepository {
    /// 创建新的 StockSnapshotRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整套替换快照 (全删全插, 单事务)
    ///
    /// # 参数
    /// - `entries`: 新快照行 (须共享同一 snapshot_at)
    ///
    /// # 返回
    /// - `Ok(count)`: 写入行数
    ///
    /// # 红线
    /// - 删除与写入必须同一事务: 失败时旧快照原样保留, 下游不会看到半套快照
    pub fn replace_all(&self, entries: &[StockSnapshotEntry]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM stock_snapshot", [])?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO stock_snapshot (
                    warehouse_id, item_id, on_hand_qty, reserved_qty,
                    available_qty, incoming_qty, snapshot_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for entry in entries {
                stmt.execute(params![
                    &entry.warehouse_id,
                    &entry.item_id,
                    entry.on_hand_qty,
                    entry.reserved_qty,
                    entry.available_qty,
                    entry.incoming_qty,
                    entry.snapshot_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(entries.len())
    }

    /// 按 (仓库, 商品) 查询快照行
    pub fn find_by_key(
        &self,
        warehouse_id: &str,
        item_id: &str,
    ) -> RepositoryResult<Option<StockSnapshotEntry>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT warehouse_id, item_id, on_hand_qty, reserved_qty,
                      available_qty, incoming_qty, snapshot_at
               FROM stock_snapshot
               WHERE warehouse_id = ? AND item_id = ?"#,
            params![warehouse_id, item_id],
            |row| Self::map_row(row),
        ) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部快照行
    pub fn find_all(&self) -> RepositoryResult<Vec<StockSnapshotEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT warehouse_id, item_id, on_hand_qty, reserved_qty,
                      available_qty, incoming_qty, snapshot_at
               FROM stock_snapshot
               ORDER BY warehouse_id, item_id"#,
        )?;

        let entries = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<StockSnapshotEntry>, _>>()?;

        Ok(entries)
    }

    /// 快照行数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM stock_snapshot", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 当前快照时刻 (空快照时返回 None)
    pub fn current_snapshot_at(&self) -> RepositoryResult<Option<NaiveDateTime>> {
        let conn = self.get_conn()?;

        let raw: Option<String> =
            conn.query_row("SELECT MAX(snapshot_at) FROM stock_snapshot", [], |row| row.get(0))?;

        match raw {
            Some(s) => {
                let ts = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .map_err(|e| RepositoryError::FieldValueError {
                        field: "snapshot_at".to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Some(ts))
            }
            None => Ok(None),
        }
    }

    /// 映射数据库行到 StockSnapshotEntry
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<StockSnapshotEntry> {
        Ok(StockSnapshotEntry {
            warehouse_id: row.get(0)?,
            item_id: row.get(1)?,
            on_hand_qty: row.get(2)?,
            reserved_qty: row.get(3)?,
            available_qty: row.get(4)?,
            incoming_qty: row.get(5)?,
            snapshot_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(6)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
            })?,
        })
    }
}
