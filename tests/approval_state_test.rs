// ==========================================
// 候补审批状态机测试
// ==========================================
// 职责: 验证状态迁移红线 / 批量审批 / 乐观锁编辑 / 送信接口
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod approval_state_test {
    use crate::test_helpers::{seed_two_tier_scenario, setup_test_state};
    use wms_replenish::api::ApiError;
    use wms_replenish::app::AppState;
    use wms_replenish::domain::candidate::ReplenishCandidate;
    use wms_replenish::domain::types::CandidateStatus;
    use wms_replenish::engine::CandidateEdit;

    /// 跑一轮计算并返回 (batch_code, 候补一览)
    fn run_and_fetch(state: &AppState) -> (String, Vec<ReplenishCandidate>) {
        let (_snap, calc) = state.batch_api.run_all().unwrap();
        let batch_code = calc.batch_code.unwrap();
        let candidates = state.approval_api.list_by_batch(&batch_code).unwrap();
        assert!(!candidates.is_empty());
        (batch_code, candidates)
    }

    // ==========================================
    // 测试1: 批量承认
    // ==========================================

    #[test]
    fn test_approve_batch() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (batch_code, candidates) = run_and_fetch(&state);

        let count = state.approval_api.approve_batch(&batch_code, "担当者A").unwrap();
        assert_eq!(count, candidates.len());

        let after = state.approval_api.list_by_batch(&batch_code).unwrap();
        assert!(after.iter().all(|c| c.status == CandidateStatus::Approved));
        // 批量操作也推进 lock_version
        assert!(after.iter().all(|c| c.lock_version == 1));
    }

    // ==========================================
    // 测试2: 批量除外需要理由
    // ==========================================

    #[test]
    fn test_exclude_batch_requires_reason() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (batch_code, _candidates) = run_and_fetch(&state);

        let result = state.approval_api.exclude_batch(&batch_code, "  ", "担当者A");
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

        let count = state
            .approval_api
            .exclude_batch(&batch_code, "棚卸中のため今回見送り", "担当者A")
            .unwrap();
        assert!(count > 0);

        let after = state.approval_api.list_by_batch(&batch_code).unwrap();
        assert!(after.iter().all(|c| c.status == CandidateStatus::Excluded));
        assert!(after
            .iter()
            .all(|c| c.exclusion_reason.as_deref() == Some("棚卸中のため今回見送り")));
    }

    // ==========================================
    // 测试3: 乐观锁编辑 — 正常编辑推进版本
    // ==========================================

    #[test]
    fn test_edit_bumps_version_and_stamps_modifier() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (_batch_code, candidates) = run_and_fetch(&state);

        let target = &candidates[0];
        assert_eq!(target.lock_version, 0);
        assert!(!target.is_manually_modified);

        let updated = state
            .approval_api
            .edit_candidate(
                &target.candidate_id,
                target.lock_version,
                CandidateEdit {
                    order_qty: Some(30.0),
                    ..Default::default()
                },
                "担当者B",
            )
            .unwrap();

        assert_eq!(updated.order_qty, 30.0);
        assert_eq!(updated.lock_version, 1);
        assert!(updated.is_manually_modified);
        assert_eq!(updated.modified_by.as_deref(), Some("担当者B"));
        assert!(updated.modified_at.is_some());
    }

    // ==========================================
    // 测试4: 乐观锁冲突 — 两个旧版本编辑恰有一个成功
    // ==========================================

    #[test]
    fn test_stale_edit_rejected() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (_batch_code, candidates) = run_and_fetch(&state);

        let target = &candidates[0];

        // 两个操作员读取同一版本
        let seen_version = target.lock_version;

        // 操作员1编辑成功
        state
            .approval_api
            .edit_candidate(
                &target.candidate_id,
                seen_version,
                CandidateEdit {
                    order_qty: Some(30.0),
                    ..Default::default()
                },
                "担当者A",
            )
            .unwrap();

        // 操作员2带同一旧版本编辑 → 乐观锁冲突, 不得静默覆盖
        let result = state.approval_api.edit_candidate(
            &target.candidate_id,
            seen_version,
            CandidateEdit {
                order_qty: Some(99.0),
                ..Default::default()
            },
            "担当者B",
        );

        assert!(matches!(result, Err(ApiError::OptimisticLockConflict(_))));

        // 值保持操作员1的结果
        let current = state
            .approval_api
            .get_candidate(&target.candidate_id)
            .unwrap()
            .unwrap();
        assert_eq!(current.order_qty, 30.0);

        // 重取最新版本后重试成功
        let retried = state
            .approval_api
            .edit_candidate(
                &target.candidate_id,
                current.lock_version,
                CandidateEdit {
                    order_qty: Some(99.0),
                    ..Default::default()
                },
                "担当者B",
            )
            .unwrap();
        assert_eq!(retried.order_qty, 99.0);
    }

    // ==========================================
    // 测试5: 除外候补不得直达确定 (须先重开)
    // ==========================================

    #[test]
    fn test_excluded_cannot_reach_confirmed_directly() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (_batch_code, candidates) = run_and_fetch(&state);

        let target = &candidates[0];

        // PENDING → EXCLUDED
        let excluded = state
            .approval_api
            .transition_candidate(
                &target.candidate_id,
                target.lock_version,
                CandidateStatus::Excluded,
                Some("发注停止品"),
                "担当者A",
            )
            .unwrap();
        assert_eq!(excluded.status, CandidateStatus::Excluded);

        // EXCLUDED → CONFIRMED 禁止
        let result = state.approval_api.transition_candidate(
            &target.candidate_id,
            excluded.lock_version,
            CandidateStatus::Confirmed,
            None,
            "担当者A",
        );
        assert!(matches!(result, Err(ApiError::InvalidStateTransition { .. })));

        // 重开: EXCLUDED → PENDING → APPROVED → CONFIRMED
        let reopened = state
            .approval_api
            .transition_candidate(
                &target.candidate_id,
                excluded.lock_version,
                CandidateStatus::Pending,
                None,
                "担当者A",
            )
            .unwrap();
        assert_eq!(reopened.status, CandidateStatus::Pending);
        assert!(reopened.exclusion_reason.is_none(), "重开时应清除除外理由");

        let approved = state
            .approval_api
            .transition_candidate(
                &reopened.candidate_id,
                reopened.lock_version,
                CandidateStatus::Approved,
                None,
                "担当者A",
            )
            .unwrap();

        let confirmed = state
            .approval_api
            .transition_candidate(
                &approved.candidate_id,
                approved.lock_version,
                CandidateStatus::Confirmed,
                None,
                "担当者A",
            )
            .unwrap();
        assert_eq!(confirmed.status, CandidateStatus::Confirmed);
    }

    // ==========================================
    // 测试6: 确定候补的送信流程 (取件→送信完了→执行完了)
    // ==========================================

    #[test]
    fn test_transmission_flow() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (batch_code, candidates) = run_and_fetch(&state);

        state.approval_api.approve_batch(&batch_code, "担当者A").unwrap();
        state.approval_api.confirm_batch(&batch_code, "担当者A").unwrap();

        // 取件口: 已确定且未送信
        let pending_transmission = state.approval_api.list_confirmed_untransmitted().unwrap();
        assert_eq!(pending_transmission.len(), candidates.len());

        let ids: Vec<String> = pending_transmission
            .iter()
            .map(|c| c.candidate_id.clone())
            .collect();

        // 送信完了
        let sent = state.approval_api.mark_transmitted(&ids).unwrap();
        assert_eq!(sent, ids.len());
        assert!(state
            .approval_api
            .list_confirmed_untransmitted()
            .unwrap()
            .is_empty());

        // 执行完了回执: CONFIRMED → EXECUTED
        for id in &ids {
            state.approval_api.mark_executed(id).unwrap();
        }

        let after = state.approval_api.list_by_batch(&batch_code).unwrap();
        assert!(after.iter().all(|c| c.status == CandidateStatus::Executed));
        assert!(after.iter().all(|c| c.executed_at.is_some()));

        // EXECUTED は终态: 再度回执はエラー
        let result = state.approval_api.mark_executed(&ids[0]);
        assert!(matches!(result, Err(ApiError::InvalidStateTransition { .. })));
    }

    // ==========================================
    // 测试7: 确定后的候补不可编辑
    // ==========================================

    #[test]
    fn test_confirmed_candidate_not_editable() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();
        let (batch_code, _candidates) = run_and_fetch(&state);

        state.approval_api.approve_batch(&batch_code, "担当者A").unwrap();
        state.approval_api.confirm_batch(&batch_code, "担当者A").unwrap();

        let confirmed = &state.approval_api.list_by_batch(&batch_code).unwrap()[0];

        let result = state.approval_api.edit_candidate(
            &confirmed.candidate_id,
            confirmed.lock_version,
            CandidateEdit {
                order_qty: Some(1.0),
                ..Default::default()
            },
            "担当者A",
        );

        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));
    }
}
