// ==========================================
// 仓储运营后台 - 库存快照领域模型
// ==========================================
// 红线: 快照一经写入不可变更; 下一次生成整套替换, 不做合并
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// StockSnapshotEntry - 库存快照行
// ==========================================
// 同一次生成的所有行共享同一个 snapshot_at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshotEntry {
    pub warehouse_id: String,      // 仓库ID
    pub item_id: String,           // 商品ID
    pub on_hand_qty: f64,          // 在库数
    pub reserved_qty: f64,         // 引当数 (已预占)
    pub available_qty: f64,        // 有效在库数 (= on_hand - reserved)
    pub incoming_qty: f64,         // 入库预定数
    pub snapshot_at: NaiveDateTime, // 快照时刻
}

impl StockSnapshotEntry {
    /// 由实时库存行生成快照行
    pub fn from_live(
        warehouse_id: String,
        item_id: String,
        on_hand_qty: f64,
        reserved_qty: f64,
        incoming_qty: f64,
        snapshot_at: NaiveDateTime,
    ) -> Self {
        Self {
            available_qty: on_hand_qty - reserved_qty,
            warehouse_id,
            item_id,
            on_hand_qty,
            reserved_qty,
            incoming_qty,
            snapshot_at,
        }
    }
}
