// ==========================================
// 仓储运营后台 - 引擎层错误类型
// ==========================================
// 错误分级:
// - 结构性设定错误 (循环引用/缺失供给边): 运行整体中止, 不自动重试
// - 存储错误: 运行中止并记入台账, 可安全重跑
// - 锁竞争: 调用方可退避重试, 绝不静默跳过
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 结构性设定错误 (不可自动重试) =====
    #[error("供给图存在循环引用: {path}")]
    CycleDetected { path: String },

    #[error("库存快照不存在, 请先运行快照生成")]
    SnapshotMissing,

    #[error("结构性设定错误: {0}")]
    StructuralConfig(String),

    // ===== 并发控制 =====
    #[error("命名锁竞争超时: key={key}, timeout_ms={timeout_ms}")]
    LockContended { key: String, timeout_ms: u64 },

    #[error("同名批处理正在运行中, 本次触发被跳过: {process_name}")]
    JobOverlapped { process_name: String },

    // ===== 业务规则 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 透传 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl EngineError {
    /// 是否为乐观锁冲突 (调用方须重取重试)
    pub fn is_stale_edit(&self) -> bool {
        matches!(
            self,
            EngineError::Repository(RepositoryError::OptimisticLockFailure { .. })
        )
    }

    /// 是否为锁竞争 (调用方可退避重试)
    pub fn is_contended(&self) -> bool {
        matches!(self, EngineError::LockContended { .. })
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
