// ==========================================
// 仓储运营后台 - 候补审批状态机
// ==========================================
// 状态机: PENDING → APPROVED → CONFIRMED → EXECUTED
//         PENDING → EXCLUDED (需除外理由; 可退回 PENDING)
// 并发控制: 单条变更带 lock_version 条件更新; 0 行命中 = 乐观锁冲突,
//           调用方必须重取重试, 绝不静默覆盖
// ==========================================

use crate::domain::candidate::ReplenishCandidate;
use crate::domain::types::{CandidateStatus, QuantityType};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::CandidateRepository;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

/// 单条编辑的变更内容 (None = 不变更)
#[derive(Debug, Clone, Default)]
pub struct CandidateEdit {
    pub order_qty: Option<f64>,
    pub quantity_type: Option<QuantityType>,
    pub expected_arrival_date: Option<Option<NaiveDate>>,
}

// ==========================================
// ApprovalEngine - 候补审批状态机
// ==========================================
pub struct ApprovalEngine {
    candidate_repo: Arc<CandidateRepository>,
}

impl ApprovalEngine {
    /// 创建新的 ApprovalEngine 实例
    pub fn new(candidate_repo: Arc<CandidateRepository>) -> Self {
        Self { candidate_repo }
    }

    // ==========================================
    // 批量操作 (batch_code 范围)
    // ==========================================

    /// 批量承认: 该批次全部 PENDING → APPROVED
    pub fn approve_batch(&self, batch_code: &str, operator: &str) -> EngineResult<usize> {
        let count = self.candidate_repo.bulk_update_status(
            batch_code,
            CandidateStatus::Pending,
            CandidateStatus::Approved,
            None,
            operator,
        )?;

        info!(batch_code = %batch_code, operator = %operator, count = count, "批量承认完成");
        Ok(count)
    }

    /// 批量除外: 该批次全部 PENDING → EXCLUDED (理由必填)
    pub fn exclude_batch(
        &self,
        batch_code: &str,
        reason: &str,
        operator: &str,
    ) -> EngineResult<usize> {
        if reason.trim().is_empty() {
            return Err(EngineError::BusinessRuleViolation(
                "除外操作必须填写除外理由".to_string(),
            ));
        }

        let count = self.candidate_repo.bulk_update_status(
            batch_code,
            CandidateStatus::Pending,
            CandidateStatus::Excluded,
            Some(reason),
            operator,
        )?;

        info!(batch_code = %batch_code, operator = %operator, count = count, "批量除外完成");
        Ok(count)
    }

    /// 批量确定: 该批次全部 APPROVED → CONFIRMED (之后进入送信对象)
    pub fn confirm_batch(&self, batch_code: &str, operator: &str) -> EngineResult<usize> {
        let count = self.candidate_repo.bulk_update_status(
            batch_code,
            CandidateStatus::Approved,
            CandidateStatus::Confirmed,
            None,
            operator,
        )?;

        info!(batch_code = %batch_code, operator = %operator, count = count, "批量确定完成");
        Ok(count)
    }

    // ==========================================
    // 单条操作 (乐观锁保护)
    // ==========================================

    /// 单条编辑 (仅 PENDING / APPROVED 可编辑)
    ///
    /// # 参数
    /// - `expected_version`: 调用方最后读取到的 lock_version
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: 版本冲突, 须重取重试
    /// - `EngineError::BusinessRuleViolation`: 当前状态不可编辑
    pub fn edit_candidate(
        &self,
        candidate_id: &str,
        expected_version: i64,
        edit: CandidateEdit,
        operator: &str,
    ) -> EngineResult<ReplenishCandidate> {
        let mut candidate = self.load(candidate_id)?;

        if !matches!(
            candidate.status,
            CandidateStatus::Pending | CandidateStatus::Approved
        ) {
            return Err(EngineError::BusinessRuleViolation(format!(
                "状态 {} 的候补不可编辑",
                candidate.status
            )));
        }

        if let Some(qty) = edit.order_qty {
            if qty < 0.0 {
                return Err(EngineError::BusinessRuleViolation(format!(
                    "发注数量不可为负: {}",
                    qty
                )));
            }
            candidate.order_qty = qty;
        }
        if let Some(qt) = edit.quantity_type {
            candidate.quantity_type = qt;
        }
        if let Some(date) = edit.expected_arrival_date {
            candidate.expected_arrival_date = date;
        }

        // 以调用方所见版本做条件更新
        candidate.lock_version = expected_version;
        candidate.modified_by = Some(operator.to_string());

        self.candidate_repo.update_with_version(&candidate)?;
        self.load(candidate_id)
    }

    /// 单条状态迁移 (can_transition 表 + 乐观锁)
    ///
    /// # 参数
    /// - `reason`: 迁移到 EXCLUDED 时必填
    pub fn transition_candidate(
        &self,
        candidate_id: &str,
        expected_version: i64,
        to: CandidateStatus,
        reason: Option<&str>,
        operator: &str,
    ) -> EngineResult<ReplenishCandidate> {
        let mut candidate = self.load(candidate_id)?;

        if !candidate.status.can_transition(to) {
            return Err(EngineError::InvalidStateTransition {
                from: candidate.status.to_db_str().to_string(),
                to: to.to_db_str().to_string(),
            });
        }

        if to == CandidateStatus::Excluded {
            match reason {
                Some(r) if !r.trim().is_empty() => {
                    candidate.exclusion_reason = Some(r.to_string());
                }
                _ => {
                    return Err(EngineError::BusinessRuleViolation(
                        "除外操作必须填写除外理由".to_string(),
                    ))
                }
            }
        }

        // 退回 PENDING 时清除除外理由
        if to == CandidateStatus::Pending {
            candidate.exclusion_reason = None;
        }

        candidate.status = to;
        candidate.lock_version = expected_version;
        candidate.modified_by = Some(operator.to_string());

        self.candidate_repo.update_with_version(&candidate)?;

        info!(
            candidate_id = %candidate_id,
            to = %to,
            operator = %operator,
            "候补状态迁移完成"
        );

        self.load(candidate_id)
    }

    /// 执行完了回执 (送信协作方确认送信成功: CONFIRMED → EXECUTED)
    pub fn mark_executed(&self, candidate_id: &str) -> EngineResult<()> {
        self.candidate_repo.mark_executed(candidate_id)?;
        info!(candidate_id = %candidate_id, "候补执行完了");
        Ok(())
    }

    fn load(&self, candidate_id: &str) -> EngineResult<ReplenishCandidate> {
        self.candidate_repo
            .find_by_id(candidate_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ReplenishCandidate".to_string(),
                id: candidate_id.to_string(),
            })
    }
}
