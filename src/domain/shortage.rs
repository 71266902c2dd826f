// ==========================================
// 仓储运营后台 - 欠品与横持调拨领域模型
// ==========================================
// 不变量: 同一欠品的 assign_qty 合计不得超过 shortage_qty (禁止超量充当)
// ==========================================

use crate::domain::types::{CorrectionStatus, QuantityType, ShortageStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Shortage - 欠品 (拣货时点的缺货)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortage {
    pub shortage_id: String,            // 欠品ID
    pub warehouse_id: String,           // 发生仓库
    pub item_id: String,                // 商品ID
    pub trade_id: String,               // 受注ID
    pub trade_item_id: String,          // 受注明细ID
    pub order_qty: f64,                 // 受注数量
    pub shortage_qty: f64,              // 缺货数量
    pub qty_type_at_order: QuantityType, // 受注时数量区分
    pub source_pick_result_id: String,  // 拣货实绩ID (订正的幂等键)
    pub status: ShortageStatus,         // 对应状态
    pub confirmed_by: Option<String>,   // 确认人
    pub confirmed_at: Option<NaiveDateTime>, // 确认时刻
    pub created_at: NaiveDateTime,      // 登记时刻
}

// ==========================================
// ShortageAllocation - 横持ち出荷 (跨仓充当明细)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortageAllocation {
    pub allocation_id: String,        // 充当ID
    pub shortage_id: String,          // 对应欠品
    pub source_warehouse_id: String,  // 供给源仓库 (出库侧)
    pub target_warehouse_id: String,  // 欠品仓库 (入库侧)
    pub item_id: String,              // 商品ID
    pub assign_qty: f64,              // 充当数量
    pub assign_qty_type: QuantityType, // 充当数量区分
    pub is_finished: bool,            // 实物出库完了
    pub finished_by: Option<String>,  // 完了操作人
    pub finished_at: Option<NaiveDateTime>, // 完了时刻
    pub created_at: NaiveDateTime,    // 生成时刻
}

// ==========================================
// QuantityCorrection - 数量订正出队记录
// ==========================================
// 横持全量完了后入队; request_id = source_pick_result_id, 重复入队为 no-op
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityCorrection {
    pub correction_id: String,       // 订正ID
    pub request_id: String,          // 幂等键
    pub trade_id: String,            // 受注ID
    pub trade_item_id: String,       // 受注明细ID
    pub update_qty: f64,             // 订正数量 (按此数减少原受注)
    pub quantity_type: QuantityType, // 数量区分
    pub status: CorrectionStatus,    // 出队状态
    pub created_at: NaiveDateTime,   // 入队时刻
    pub sent_at: Option<NaiveDateTime>, // 送出时刻
}
