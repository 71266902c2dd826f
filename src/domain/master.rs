// ==========================================
// 仓储运营后台 - 主数据领域模型
// ==========================================
// 仓库/商品/供应商/配送便路线
// ==========================================

use crate::domain::types::LotFeeType;
use serde::{Deserialize, Serialize};

// ==========================================
// Warehouse - 仓库主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: String,   // 仓库ID
    pub warehouse_name: String, // 仓库名
    pub is_active: bool,        // 是否在用
}

// ==========================================
// Item - 商品主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,   // 商品ID
    pub item_name: String, // 商品名
    pub is_active: bool,   // 是否在用
}

// ==========================================
// Contractor - 供应商主数据
// ==========================================
// lot_unit_qty: 发注ロット(订货单位)。None/0 表示不做圆整
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contractor {
    pub contractor_id: String,    // 供应商ID
    pub contractor_name: String,  // 供应商名
    pub lot_unit_qty: Option<f64>, // 发注ロット
    pub lot_fee_type: LotFeeType, // 手数料类型
    pub lot_fee_amount: f64,      // 手数料单价/定额
    pub is_active: bool,          // 是否在用
}

impl Contractor {
    /// 是否定义了有效的发注ロット
    pub fn has_lot_unit(&self) -> bool {
        matches!(self.lot_unit_qty, Some(q) if q > 0.0)
    }
}

// ==========================================
// WarehouseRoute - 配送便路线
// ==========================================
// 横持充当时供给源仓库的排序依据; priority 越小越优先
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseRoute {
    pub source_warehouse_id: String, // 供给源仓库
    pub target_warehouse_id: String, // 对象仓库
    pub priority: i64,               // 优先度
}
