// ==========================================
// 仓储运营后台 - 批处理台账领域模型
// ==========================================
// 每次定时/手动运行一行; 运行不可中途恢复, 以 batch_code 保证幂等重跑
// ==========================================

use crate::domain::types::JobStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ===== 处理名 (process_name) =====
pub const PROCESS_STOCK_SNAPSHOT: &str = "STOCK_SNAPSHOT";
pub const PROCESS_REPLENISH_CALC: &str = "REPLENISH_CALC";

// ==========================================
// JobControl - 批处理台账
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobControl {
    pub job_id: String,                  // 运行ID
    pub batch_code: Option<String>,      // 批次代码 (计算系运行时非空)
    pub process_name: String,            // 处理名
    pub status: JobStatus,               // 运行状态
    pub processed_records: i64,          // 处理件数
    pub progress_current: i64,           // 进度 (当前)
    pub progress_total: i64,             // 进度 (总数)
    pub started_at: Option<NaiveDateTime>, // 开始时刻
    pub ended_at: Option<NaiveDateTime>,   // 结束时刻
    pub error_message: Option<String>,   // 错误信息 (FAILED 时)
    pub created_at: NaiveDateTime,       // 登记时刻
}

impl JobControl {
    /// 是否正常结束
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}
