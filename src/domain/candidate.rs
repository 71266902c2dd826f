// ==========================================
// 仓储运营后台 - 补货候补领域模型
// ==========================================
// batch_code: 一次计算运行的幂等/分组键, 同一运行产出的候补共享同一值
// 红线: 候补只经由审批状态机变更; 除管理操作外不删除
// ==========================================

use crate::domain::types::{CandidateStatus, CandidateType, LotFeeType, QuantityType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ReplenishCandidate - 补货候补
// ==========================================
// 发注候补 (ORDER, 来源=供应商) 与移库候补 (TRANSFER, 来源=上位仓库) 共用一个实体,
// 以 candidate_type + 来源字段区分 (与 supply_setting 的形状一致)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishCandidate {
    pub candidate_id: String,                 // 候补ID
    pub batch_code: String,                   // 批次代码
    pub candidate_type: CandidateType,        // ORDER / TRANSFER
    pub warehouse_id: String,                 // 补货对象仓库
    pub item_id: String,                      // 商品ID
    pub source_contractor_id: Option<String>, // 供应商 (ORDER 时非空)
    pub source_warehouse_id: Option<String>,  // 供给源仓库 (TRANSFER 时非空)

    // ===== 计算结果 =====
    pub self_shortage_qty: f64,    // 自仓不足数
    pub upstream_demand_qty: f64,  // 来自下位仓库的需求累计
    pub suggested_qty: f64,        // 建议数量 (ロット调整前为 lot_before)
    pub order_qty: f64,            // 发注/移库数量 (人工可编辑, 默认=ロット调整后)
    pub quantity_type: QuantityType, // 数量区分
    pub expected_arrival_date: Option<NaiveDate>, // 入库预定日

    // ===== 审批状态 =====
    pub status: CandidateStatus,        // 候补状态
    pub exclusion_reason: Option<String>, // 除外理由 (EXCLUDED 时必填)

    // ===== ロット调整记录 =====
    pub lot_before_qty: Option<f64>,     // 圆整前数量
    pub lot_after_qty: Option<f64>,      // 圆整后数量
    pub lot_fee_type: Option<LotFeeType>, // 手数料类型
    pub lot_fee_amount: Option<f64>,     // 手数料金额

    // ===== 编辑痕迹 / 乐观锁 =====
    pub is_manually_modified: bool,      // 是否人工修改过
    pub modified_by: Option<String>,     // 修改人
    pub modified_at: Option<NaiveDateTime>, // 修改时刻
    pub lock_version: i64,               // 乐观锁版本号

    pub created_at: NaiveDateTime,          // 生成时刻
    pub transmitted_at: Option<NaiveDateTime>, // 送信时刻
    pub executed_at: Option<NaiveDateTime>,    // 执行确认时刻
}

impl ReplenishCandidate {
    /// 是否已进入送信对象 (CONFIRMED 且未送信)
    pub fn is_awaiting_transmission(&self) -> bool {
        self.status == CandidateStatus::Confirmed && self.transmitted_at.is_none()
    }

    /// ロット圆整增量 (= lot_after - lot_before)
    pub fn lot_delta_qty(&self) -> f64 {
        match (self.lot_after_qty, self.lot_before_qty) {
            (Some(after), Some(before)) => after - before,
            _ => 0.0,
        }
    }
}
