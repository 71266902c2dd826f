// ==========================================
// 仓储运营后台 - API层错误类型
// ==========================================
// 职责: 把引擎/仓储错误归一为调用方可处置的类别
// - 乐观锁冲突 → 重取重试
// - 锁竞争 → 退避重试
// - 批处理重入 → 本次跳过 (不是失败)
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 输入与资源 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ===== 业务规则 =====
    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 并发控制 =====
    /// 乐观锁冲突: 调用方须重取最新版本后重试
    #[error("乐观锁冲突: {0}")]
    OptimisticLockConflict(String),

    /// 命名锁竞争: 调用方可退避重试
    #[error("锁竞争: {0}")]
    Contended(String),

    /// 同名批处理运行中: 本次触发被跳过, 不排队
    #[error("批处理重入: {0}")]
    JobOverlapped(String),

    // ===== 结构性设定错误 =====
    #[error("结构性设定错误: {0}")]
    StructuralConfig(String),

    // ===== 基础设施 =====
    #[error("数据库错误: {0}")]
    Database(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure { .. } => {
                ApiError::OptimisticLockConflict(err.to_string())
            }
            RepositoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::ValidationError(msg)
            | RepositoryError::FieldValueError { message: msg, .. } => ApiError::InvalidInput(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CycleDetected { .. } | EngineError::SnapshotMissing => {
                ApiError::StructuralConfig(err.to_string())
            }
            EngineError::StructuralConfig(msg) => ApiError::StructuralConfig(msg),
            EngineError::LockContended { .. } => ApiError::Contended(err.to_string()),
            EngineError::JobOverlapped { process_name } => ApiError::JobOverlapped(process_name),
            EngineError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            EngineError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            EngineError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            EngineError::Repository(repo_err) => ApiError::from(repo_err),
            EngineError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
