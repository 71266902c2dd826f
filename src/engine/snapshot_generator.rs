// ==========================================
// 仓储运营后台 - 库存快照生成器
// ==========================================
// 职责: 把实时库存物化为单一时刻的一致快照, 供补货计算只读消费
// 红线: 整套替换且全有全无——失败时旧快照原样保留, 台账记 FAILED
// ==========================================

use crate::domain::job::{JobControl, PROCESS_STOCK_SNAPSHOT};
use crate::domain::snapshot::StockSnapshotEntry;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{JobControlRepository, StockSnapshotRepository, WarehouseStockRepository};
use std::sync::Arc;
use tracing::{error, info};

// ==========================================
// SnapshotGenerator - 库存快照生成器
// ==========================================
pub struct SnapshotGenerator {
    stock_repo: Arc<WarehouseStockRepository>,
    snapshot_repo: Arc<StockSnapshotRepository>,
    job_repo: Arc<JobControlRepository>,
}

impl SnapshotGenerator {
    /// 创建新的 SnapshotGenerator 实例
    pub fn new(
        stock_repo: Arc<WarehouseStockRepository>,
        snapshot_repo: Arc<StockSnapshotRepository>,
        job_repo: Arc<JobControlRepository>,
    ) -> Self {
        Self {
            stock_repo,
            snapshot_repo,
            job_repo,
        }
    }

    /// 生成全量快照
    ///
    /// # 处理
    /// 1. 读取在用仓库×在用商品的实时库存聚合
    /// 2. 以单一 snapshot_at 构建快照行 (available = on_hand - reserved)
    /// 3. 单事务整套替换旧快照
    /// 4. 台账: process_name=STOCK_SNAPSHOT, processed_records=快照行数
    ///
    /// # 返回
    /// - `Ok(JobControl)`: SUCCESS 台账行
    /// - `Err`: 任何读写错误; 台账记 FAILED, 旧快照不受影响
    pub fn generate_all(&self) -> EngineResult<JobControl> {
        let job_id = self.job_repo.start_run(PROCESS_STOCK_SNAPSHOT, None)?;

        info!(job_id = %job_id, "开始生成库存快照");

        match self.generate_inner(&job_id) {
            Ok(count) => {
                self.job_repo.finish_success(&job_id, count as i64)?;

                info!(job_id = %job_id, snapshot_rows = count, "库存快照生成完成");

                self.job_repo.find_by_id(&job_id)?.ok_or_else(|| EngineError::NotFound {
                    entity: "JobControl".to_string(),
                    id: job_id.clone(),
                })
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "库存快照生成失败");
                // 收尾失败不掩盖原始错误
                let _ = self.job_repo.finish_failed(&job_id, &e.to_string());
                Err(e)
            }
        }
    }

    fn generate_inner(&self, job_id: &str) -> EngineResult<usize> {
        let live_rows = self.stock_repo.find_all_active()?;
        let snapshot_at = chrono::Utc::now().naive_utc();

        self.job_repo.update_progress(job_id, 0, live_rows.len() as i64)?;

        let entries: Vec<StockSnapshotEntry> = live_rows
            .into_iter()
            .map(|row| {
                StockSnapshotEntry::from_live(
                    row.warehouse_id,
                    row.item_id,
                    row.on_hand_qty,
                    row.reserved_qty,
                    row.incoming_qty,
                    snapshot_at,
                )
            })
            .collect();

        let count = self.snapshot_repo.replace_all(&entries)?;

        Ok(count)
    }
}
