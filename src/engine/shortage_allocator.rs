// ==========================================
// 仓储运营后台 - 欠品横持充当引擎
// ==========================================
// 职责: 拣货时点发生欠品后, 从其他仓库的有效在库中横持充当
// 并发控制: "alloc:{欠品仓库}:{商品}" 命名锁, 有界超时 (默认约1秒);
//           超时返回 Contended 由调用方重试, 绝不当作"无欠品"静默跳过
// 不变量: 同一欠品的 assign_qty 合计不得超过 shortage_qty
// ==========================================

use crate::config::ConfigManager;
use crate::domain::shortage::{Shortage, ShortageAllocation};
use crate::domain::types::ShortageStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lock_manager::NamedLockManager;
use crate::repository::{
    QuantityCorrectionRepository, ShortageRepository, WarehouseStockRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// 充当结果
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    /// 本次新建的充当明细
    pub allocations: Vec<ShortageAllocation>,
    /// 充当后仍未覆盖的数量 (>0 = 部分充当, 合法的暂定终态)
    pub remaining_qty: f64,
    /// 充当后的欠品状态
    pub status: ShortageStatus,
}

// ==========================================
// ShortageAllocator - 横持充当引擎
// ==========================================
pub struct ShortageAllocator {
    shortage_repo: Arc<ShortageRepository>,
    stock_repo: Arc<WarehouseStockRepository>,
    correction_repo: Arc<QuantityCorrectionRepository>,
    lock_manager: NamedLockManager,
    config_manager: Arc<ConfigManager>,
}

impl ShortageAllocator {
    /// 创建新的 ShortageAllocator 实例
    pub fn new(
        shortage_repo: Arc<ShortageRepository>,
        stock_repo: Arc<WarehouseStockRepository>,
        correction_repo: Arc<QuantityCorrectionRepository>,
        lock_manager: NamedLockManager,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            shortage_repo,
            stock_repo,
            correction_repo,
            lock_manager,
            config_manager,
        }
    }

    /// 对指定欠品执行横持充当
    ///
    /// # 处理
    /// 1. 获取 "alloc:{仓库}:{商品}" 命名锁 (超时 → Contended)
    /// 2. 锁内重新计算剩余欠品数 (shortage_qty - 既存充当合计)
    /// 3. 按配送便优先度遍历供给源, 贪心充当 min(剩余, 供给源有效在库)
    /// 4. 充当明细 + 供给源预占 + 欠品状态 单事务写入
    /// 5. 锁凭证 Drop 释放 (成功/部分/出错都会执行)
    ///
    /// # 返回
    /// - 供给源耗尽仍未全量覆盖时: status 停留 PROCESSING (部分充当不是错误)
    pub fn allocate(&self, shortage_id: &str, operator: &str) -> EngineResult<AllocationOutcome> {
        let shortage = self.load_shortage(shortage_id)?;

        if shortage.shortage_qty <= 0.0 {
            return Err(EngineError::BusinessRuleViolation(format!(
                "欠品数量必须为正: shortage_id={} qty={}",
                shortage_id, shortage.shortage_qty
            )));
        }

        if shortage.status == ShortageStatus::Done {
            debug!(shortage_id = %shortage_id, "欠品已对应完了, 无需充当");
            return Ok(AllocationOutcome {
                allocations: Vec::new(),
                remaining_qty: 0.0,
                status: ShortageStatus::Done,
            });
        }

        let timeout = Duration::from_millis(self.config_manager.alloc_lock_timeout_ms()?);
        let lock_key = format!("alloc:{}:{}", shortage.warehouse_id, shortage.item_id);

        // 锁凭证持有到函数末尾, Drop 兜底释放
        let _guard = self.lock_manager.try_acquire(&lock_key, timeout)?;

        debug!(shortage_id = %shortage_id, lock_key = %lock_key, "命名锁获取成功");

        self.allocate_locked(&shortage, operator)
    }

    /// 锁内充当本体
    fn allocate_locked(
        &self,
        shortage: &Shortage,
        operator: &str,
    ) -> EngineResult<AllocationOutcome> {
        // 剩余欠品数必须在锁内计算, 防止并发充当超量
        let assigned = self.shortage_repo.sum_assigned(&shortage.shortage_id)?;
        let mut remaining = shortage.shortage_qty - assigned;

        if remaining <= 0.0 {
            return Ok(AllocationOutcome {
                allocations: Vec::new(),
                remaining_qty: 0.0,
                status: shortage.status,
            });
        }

        let donors = self
            .stock_repo
            .find_donors(&shortage.item_id, &shortage.warehouse_id)?;

        let now = chrono::Utc::now().naive_utc();
        let mut allocations: Vec<ShortageAllocation> = Vec::new();

        for donor in donors {
            if remaining <= 0.0 {
                break;
            }

            let assign_qty = remaining.min(donor.available_qty);
            if assign_qty <= 0.0 {
                continue;
            }

            allocations.push(ShortageAllocation {
                allocation_id: Uuid::new_v4().to_string(),
                shortage_id: shortage.shortage_id.clone(),
                source_warehouse_id: donor.warehouse_id.clone(),
                target_warehouse_id: shortage.warehouse_id.clone(),
                item_id: shortage.item_id.clone(),
                assign_qty,
                assign_qty_type: shortage.qty_type_at_order,
                is_finished: false,
                finished_by: None,
                finished_at: None,
                created_at: now,
            });

            remaining -= assign_qty;
        }

        if allocations.is_empty() {
            info!(
                shortage_id = %shortage.shortage_id,
                remaining = remaining,
                "无可用供给源, 欠品保持未充当"
            );
            return Ok(AllocationOutcome {
                allocations,
                remaining_qty: remaining,
                status: shortage.status,
            });
        }

        let new_status = if remaining <= 0.0 {
            ShortageStatus::Done
        } else {
            ShortageStatus::Processing
        };

        self.shortage_repo.apply_allocations(
            &shortage.shortage_id,
            &allocations,
            new_status,
            operator,
        )?;

        info!(
            shortage_id = %shortage.shortage_id,
            allocation_count = allocations.len(),
            remaining = remaining,
            status = %new_status,
            "横持充当完成"
        );

        Ok(AllocationOutcome {
            allocations,
            remaining_qty: remaining.max(0.0),
            status: new_status,
        })
    }

    /// 标记充当完了 (实物出库)
    ///
    /// 该欠品的充当全部完了时, 向订正出队表入队一条数量订正
    /// (request_id = 拣货实绩ID, 重复入队为 no-op), 订正的实际执行由下游协作方异步处理
    pub fn mark_allocation_finished(
        &self,
        allocation_id: &str,
        operator: &str,
    ) -> EngineResult<ShortageAllocation> {
        let allocation = self.shortage_repo.finish_allocation(allocation_id, operator)?;

        info!(
            allocation_id = %allocation_id,
            shortage_id = %allocation.shortage_id,
            operator = %operator,
            "横持出库完了"
        );

        if self
            .shortage_repo
            .all_allocations_finished(&allocation.shortage_id)?
        {
            let shortage = self.load_shortage(&allocation.shortage_id)?;
            let fulfilled = self
                .shortage_repo
                .sum_finished_assigned(&allocation.shortage_id)?;

            let enqueued = self.correction_repo.enqueue(
                &shortage.source_pick_result_id,
                &shortage.trade_id,
                &shortage.trade_item_id,
                fulfilled,
                shortage.qty_type_at_order,
            )?;

            if enqueued {
                info!(
                    shortage_id = %shortage.shortage_id,
                    request_id = %shortage.source_pick_result_id,
                    update_qty = fulfilled,
                    "数量订正已入队"
                );
            } else {
                debug!(
                    request_id = %shortage.source_pick_result_id,
                    "数量订正已存在, 入队为 no-op"
                );
            }
        }

        Ok(allocation)
    }

    fn load_shortage(&self, shortage_id: &str) -> EngineResult<Shortage> {
        self.shortage_repo
            .find_by_id(shortage_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Shortage".to_string(),
                id: shortage_id.to_string(),
            })
    }
}
