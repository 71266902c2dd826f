// ==========================================
// 仓储运营后台 - 批处理触发API
// ==========================================
// 对外三操作: run_snapshot / run_calculation / run_all
// withoutOverlapping: 按处理名取零超时命名锁, 同名运行中则本次跳过 (不排队)
// 调度本身归外部调度器, 这里只保证可重入安全的触发口
// ==========================================

use crate::domain::job::{JobControl, PROCESS_REPLENISH_CALC, PROCESS_STOCK_SNAPSHOT};
use crate::domain::types::JobStatus;
use crate::engine::error::EngineError;
use crate::engine::lock_manager::NamedLockManager;
use crate::engine::{EchelonCalculator, SnapshotGenerator};
use crate::api::error::ApiResult;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 运行摘要 (触发方可见的台账投影)
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub batch_code: Option<String>,
    pub process_name: String,
    pub status: JobStatus,
    pub processed_records: i64,
    pub error_message: Option<String>,
}

impl From<JobControl> for JobSummary {
    fn from(job: JobControl) -> Self {
        Self {
            job_id: job.job_id,
            batch_code: job.batch_code,
            process_name: job.process_name,
            status: job.status,
            processed_records: job.processed_records,
            error_message: job.error_message,
        }
    }
}

// ==========================================
// BatchJobApi - 批处理触发API
// ==========================================
pub struct BatchJobApi {
    snapshot_generator: Arc<SnapshotGenerator>,
    calculator: Arc<EchelonCalculator>,
    lock_manager: NamedLockManager,
}

impl BatchJobApi {
    /// 创建新的 BatchJobApi 实例
    pub fn new(
        snapshot_generator: Arc<SnapshotGenerator>,
        calculator: Arc<EchelonCalculator>,
        lock_manager: NamedLockManager,
    ) -> Self {
        Self {
            snapshot_generator,
            calculator,
            lock_manager,
        }
    }

    /// 触发快照生成 (withoutOverlapping)
    pub fn run_snapshot(&self) -> ApiResult<JobSummary> {
        let _guard = self.acquire_job_lock(PROCESS_STOCK_SNAPSHOT)?;
        let job = self.snapshot_generator.generate_all()?;
        Ok(job.into())
    }

    /// 触发补货计算 (withoutOverlapping)
    pub fn run_calculation(&self) -> ApiResult<JobSummary> {
        let _guard = self.acquire_job_lock(PROCESS_REPLENISH_CALC)?;
        let job = self.calculator.calculate_all()?;
        Ok(job.into())
    }

    /// 触发快照→计算连续运行
    pub fn run_all(&self) -> ApiResult<(JobSummary, JobSummary)> {
        let snapshot_summary = self.run_snapshot()?;
        let calc_summary = self.run_calculation()?;
        Ok((snapshot_summary, calc_summary))
    }

    /// 批处理防重入锁 (零超时: 竞争即跳过)
    fn acquire_job_lock(
        &self,
        process_name: &str,
    ) -> ApiResult<crate::engine::lock_manager::NamedLockGuard> {
        let key = format!("job:{}", process_name);

        self.lock_manager
            .try_acquire(&key, Duration::ZERO)
            .map_err(|e| match e {
                EngineError::LockContended { .. } => {
                    info!(process_name = %process_name, "同名批处理运行中, 本次触发被跳过");
                    EngineError::JobOverlapped {
                        process_name: process_name.to_string(),
                    }
                    .into()
                }
                other => other.into(),
            })
    }
}
