// ==========================================
// 仓储运营后台 - 欠品横持API
// ==========================================
// 拣货子系统的受け口 (欠品登记) + 横持充当 + 订正出队的取件口
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::shortage::{QuantityCorrection, Shortage, ShortageAllocation};
use crate::domain::types::{QuantityType, ShortageStatus};
use crate::engine::{AllocationOutcome, ShortageAllocator};
use crate::repository::{QuantityCorrectionRepository, ShortageRepository};
use std::sync::Arc;
use uuid::Uuid;

/// 欠品登记参数 (拣货子系统提供)
#[derive(Debug, Clone)]
pub struct NewShortage {
    pub warehouse_id: String,
    pub item_id: String,
    pub trade_id: String,
    pub trade_item_id: String,
    pub order_qty: f64,
    pub shortage_qty: f64,
    pub qty_type_at_order: QuantityType,
    pub source_pick_result_id: String,
}

// ==========================================
// ShortageApi - 欠品横持API
// ==========================================
pub struct ShortageApi {
    allocator: Arc<ShortageAllocator>,
    shortage_repo: Arc<ShortageRepository>,
    correction_repo: Arc<QuantityCorrectionRepository>,
}

impl ShortageApi {
    /// 创建新的 ShortageApi 实例
    pub fn new(
        allocator: Arc<ShortageAllocator>,
        shortage_repo: Arc<ShortageRepository>,
        correction_repo: Arc<QuantityCorrectionRepository>,
    ) -> Self {
        Self {
            allocator,
            shortage_repo,
            correction_repo,
        }
    }

    /// 登记欠品
    pub fn register_shortage(&self, params: NewShortage) -> ApiResult<Shortage> {
        if params.shortage_qty <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "欠品数量必须为正: {}",
                params.shortage_qty
            )));
        }
        if params.shortage_qty > params.order_qty {
            return Err(ApiError::InvalidInput(format!(
                "欠品数量不可超过受注数量: shortage={} order={}",
                params.shortage_qty, params.order_qty
            )));
        }

        let shortage = Shortage {
            shortage_id: Uuid::new_v4().to_string(),
            warehouse_id: params.warehouse_id,
            item_id: params.item_id,
            trade_id: params.trade_id,
            trade_item_id: params.trade_item_id,
            order_qty: params.order_qty,
            shortage_qty: params.shortage_qty,
            qty_type_at_order: params.qty_type_at_order,
            source_pick_result_id: params.source_pick_result_id,
            status: ShortageStatus::Before,
            confirmed_by: None,
            confirmed_at: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        self.shortage_repo.create(&shortage)?;
        Ok(shortage)
    }

    /// 按ID查询欠品
    pub fn get_shortage(&self, shortage_id: &str) -> ApiResult<Option<Shortage>> {
        Ok(self.shortage_repo.find_by_id(shortage_id)?)
    }

    /// 查询欠品的充当明细
    pub fn list_allocations(&self, shortage_id: &str) -> ApiResult<Vec<ShortageAllocation>> {
        Ok(self.shortage_repo.find_allocations(shortage_id)?)
    }

    /// 执行横持充当
    pub fn allocate(&self, shortage_id: &str, operator: &str) -> ApiResult<AllocationOutcome> {
        Ok(self.allocator.allocate(shortage_id, operator)?)
    }

    /// 标记充当完了 (实物出库)
    pub fn mark_allocation_finished(
        &self,
        allocation_id: &str,
        operator: &str,
    ) -> ApiResult<ShortageAllocation> {
        Ok(self.allocator.mark_allocation_finished(allocation_id, operator)?)
    }

    // ===== 订正出队的取件口 (受发注协作方) =====

    /// 查询待送出的数量订正
    pub fn list_queued_corrections(&self) -> ApiResult<Vec<QuantityCorrection>> {
        Ok(self.correction_repo.list_queued()?)
    }

    /// 标记订正已送出
    pub fn mark_correction_sent(&self, request_id: &str) -> ApiResult<()> {
        Ok(self.correction_repo.mark_sent(request_id)?)
    }
}
