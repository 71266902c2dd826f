// ==========================================
// 仓储运营后台 - 候补审批API
// ==========================================
// 审批面: 批量承认/除外, 单条带版本编辑, 确定候补的送信取件口
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::candidate::ReplenishCandidate;
use crate::domain::types::CandidateStatus;
use crate::engine::{ApprovalEngine, CandidateEdit};
use crate::repository::CandidateRepository;
use std::sync::Arc;

// ==========================================
// ApprovalApi - 候补审批API
// ==========================================
pub struct ApprovalApi {
    approval_engine: Arc<ApprovalEngine>,
    candidate_repo: Arc<CandidateRepository>,
}

impl ApprovalApi {
    /// 创建新的 ApprovalApi 实例
    pub fn new(approval_engine: Arc<ApprovalEngine>, candidate_repo: Arc<CandidateRepository>) -> Self {
        Self {
            approval_engine,
            candidate_repo,
        }
    }

    // ===== 查询 =====

    /// 按ID查询候补
    pub fn get_candidate(&self, candidate_id: &str) -> ApiResult<Option<ReplenishCandidate>> {
        Ok(self.candidate_repo.find_by_id(candidate_id)?)
    }

    /// 查询一个批次的全部候补
    pub fn list_by_batch(&self, batch_code: &str) -> ApiResult<Vec<ReplenishCandidate>> {
        Ok(self.candidate_repo.find_by_batch(batch_code)?)
    }

    // ===== 批量审批 =====

    /// 批量承认 (该批次全部 PENDING)
    pub fn approve_batch(&self, batch_code: &str, operator: &str) -> ApiResult<usize> {
        Ok(self.approval_engine.approve_batch(batch_code, operator)?)
    }

    /// 批量除外 (该批次全部 PENDING, 理由必填)
    pub fn exclude_batch(&self, batch_code: &str, reason: &str, operator: &str) -> ApiResult<usize> {
        Ok(self.approval_engine.exclude_batch(batch_code, reason, operator)?)
    }

    /// 批量确定 (该批次全部 APPROVED)
    pub fn confirm_batch(&self, batch_code: &str, operator: &str) -> ApiResult<usize> {
        Ok(self.approval_engine.confirm_batch(batch_code, operator)?)
    }

    // ===== 单条操作 (乐观锁) =====

    /// 单条编辑 (须携带最后读取到的 lock_version)
    pub fn edit_candidate(
        &self,
        candidate_id: &str,
        expected_version: i64,
        edit: CandidateEdit,
        operator: &str,
    ) -> ApiResult<ReplenishCandidate> {
        Ok(self
            .approval_engine
            .edit_candidate(candidate_id, expected_version, edit, operator)?)
    }

    /// 单条状态迁移 (须携带最后读取到的 lock_version)
    pub fn transition_candidate(
        &self,
        candidate_id: &str,
        expected_version: i64,
        to: CandidateStatus,
        reason: Option<&str>,
        operator: &str,
    ) -> ApiResult<ReplenishCandidate> {
        Ok(self.approval_engine.transition_candidate(
            candidate_id,
            expected_version,
            to,
            reason,
            operator,
        )?)
    }

    // ===== 送信协作方接口 =====

    /// 查询已确定且未送信的候补
    pub fn list_confirmed_untransmitted(&self) -> ApiResult<Vec<ReplenishCandidate>> {
        Ok(self.candidate_repo.find_confirmed_untransmitted()?)
    }

    /// 送信完了回调
    pub fn mark_transmitted(&self, candidate_ids: &[String]) -> ApiResult<usize> {
        Ok(self.candidate_repo.mark_transmitted(candidate_ids)?)
    }

    /// 执行完了回调 (CONFIRMED → EXECUTED)
    pub fn mark_executed(&self, candidate_id: &str) -> ApiResult<()> {
        Ok(self.approval_engine.mark_executed(candidate_id)?)
    }
}
