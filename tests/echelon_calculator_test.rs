// ==========================================
// 多级补货计算器测试
// ==========================================
// 职责: 验证层级升序计算/需求累计/ロット调整/批次语义/失败语义
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod echelon_calculator_test {
    use crate::test_helpers::{
        seed_basic_masters, seed_contractor_without_lot, seed_stock, seed_supply_edge,
        seed_two_tier_scenario, setup_test_state,
    };
    use wms_replenish::api::ApiError;
    use wms_replenish::domain::job::PROCESS_REPLENISH_CALC;
    use wms_replenish::domain::types::{CandidateStatus, CandidateType, JobStatus, SupplyType};

    // ==========================================
    // 测试1: シナリオA+B — 卫星移库 + 中心发注 (ロット圆整)
    // ==========================================

    #[test]
    fn test_two_tier_scenario_transfer_and_order() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();

        let (_snap, calc) = state.batch_api.run_all().unwrap();
        assert_eq!(calc.status, JobStatus::Success);
        assert_eq!(calc.processed_records, 2);

        let batch_code = calc.batch_code.expect("计算运行应有批次代码");
        let candidates = state.approval_api.list_by_batch(&batch_code).unwrap();
        assert_eq!(candidates.len(), 2);

        // W1 (卫星): 不足 = 20 + 5×2 - 5 = 25 → 移库候补 25, 上位需求 25
        let transfer = candidates
            .iter()
            .find(|c| c.candidate_type == CandidateType::Transfer)
            .expect("应存在移库候补");
        assert_eq!(transfer.warehouse_id, "W1");
        assert_eq!(transfer.source_warehouse_id.as_deref(), Some("W2"));
        assert_eq!(transfer.self_shortage_qty, 25.0);
        assert_eq!(transfer.suggested_qty, 25.0);
        assert_eq!(transfer.order_qty, 25.0);
        assert_eq!(transfer.status, CandidateStatus::Pending);

        // W2 (中心): 需求侧 25, 在库 10 → 建议 15, ロット20 圆整 → 发注 20
        let order = candidates
            .iter()
            .find(|c| c.candidate_type == CandidateType::Order)
            .expect("应存在发注候补");
        assert_eq!(order.warehouse_id, "W2");
        assert_eq!(order.source_contractor_id.as_deref(), Some("C1"));
        assert_eq!(order.upstream_demand_qty, 25.0);
        assert_eq!(order.suggested_qty, 15.0);
        assert_eq!(order.lot_before_qty, Some(15.0));
        assert_eq!(order.lot_after_qty, Some(20.0));
        assert_eq!(order.order_qty, 20.0);
        // 定额手数料: 圆整发生时收取
        assert_eq!(order.lot_fee_amount, Some(500.0));
    }

    // ==========================================
    // 测试2: 同批次共享 batch_code, 相邻运行互不相同
    // ==========================================

    #[test]
    fn test_batch_code_shared_within_run_unique_across_runs() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();

        let (_s1, calc1) = state.batch_api.run_all().unwrap();
        let (_s2, calc2) = state.batch_api.run_all().unwrap();

        let batch1 = calc1.batch_code.unwrap();
        let batch2 = calc2.batch_code.unwrap();
        assert_ne!(batch1, batch2, "相邻运行的批次代码必须不同");

        for batch in [&batch1, &batch2] {
            let candidates = state.approval_api.list_by_batch(batch).unwrap();
            assert!(!candidates.is_empty());
            assert!(candidates.iter().all(|c| &c.batch_code == batch),
                    "同一运行产出的候补必须共享同一批次代码");
        }
    }

    // ==========================================
    // 测试3: 多卫星需求累计 (不覆盖)
    // ==========================================

    #[test]
    fn test_multiple_satellites_accumulate_demand() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        // 两个卫星仓共用中心仓 W2; 中心仓在库 0 → 发注 = 需求合计
        seed_supply_edge(&state, "W1", "I1", SupplyType::Internal, "W2", 0, 2, 5.0, 20.0, 0.0).unwrap();
        seed_supply_edge(&state, "W3", "I1", SupplyType::Internal, "W2", 0, 0, 0.0, 12.0, 0.0).unwrap();
        seed_supply_edge(&state, "W2", "I1", SupplyType::External, "C1", 1, 0, 0.0, 0.0, 0.0).unwrap();

        seed_stock(&state, "W1", "I1", 5.0, 0.0, 0.0).unwrap(); // 不足 25
        seed_stock(&state, "W3", "I1", 2.0, 0.0, 0.0).unwrap(); // 不足 10
        seed_stock(&state, "W2", "I1", 0.0, 0.0, 0.0).unwrap();

        let (_snap, calc) = state.batch_api.run_all().unwrap();
        let candidates = state
            .approval_api
            .list_by_batch(&calc.batch_code.unwrap())
            .unwrap();

        let order = candidates
            .iter()
            .find(|c| c.candidate_type == CandidateType::Order)
            .unwrap();

        // 中心仓看到的需求 = 25 + 10 (累加而非覆盖)
        assert_eq!(order.upstream_demand_qty, 35.0);
        // 发注建议 ≥ 下位需求合计 (中心仓无在库)
        assert!(order.suggested_qty >= 35.0);
        assert_eq!(order.suggested_qty, 35.0);
        // ロット20 → 40
        assert_eq!(order.order_qty, 40.0);
    }

    // ==========================================
    // 测试4: 在库上限约束 (max_stock)
    // ==========================================

    #[test]
    fn test_transfer_capped_by_max_stock() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();
        seed_contractor_without_lot(&state, "C2").unwrap();

        // 不足 25 但上限 20: 建议 = min(25, 20 - 5) = 15
        seed_supply_edge(&state, "W1", "I1", SupplyType::Internal, "W2", 0, 2, 5.0, 20.0, 20.0).unwrap();
        seed_supply_edge(&state, "W2", "I1", SupplyType::External, "C2", 1, 0, 0.0, 0.0, 0.0).unwrap();

        seed_stock(&state, "W1", "I1", 5.0, 0.0, 0.0).unwrap();
        seed_stock(&state, "W2", "I1", 100.0, 0.0, 0.0).unwrap();

        let (_snap, calc) = state.batch_api.run_all().unwrap();
        let candidates = state
            .approval_api
            .list_by_batch(&calc.batch_code.unwrap())
            .unwrap();

        let transfer = candidates
            .iter()
            .find(|c| c.candidate_type == CandidateType::Transfer)
            .unwrap();
        assert_eq!(transfer.suggested_qty, 15.0);

        // 中心仓在库充足, 自身无发注候补
        assert!(candidates
            .iter()
            .all(|c| c.candidate_type != CandidateType::Order));
    }

    // ==========================================
    // 测试5: 入库预定数计入可用侧
    // ==========================================

    #[test]
    fn test_incoming_qty_reduces_shortage() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_supply_edge(&state, "W1", "I1", SupplyType::External, "C1", 0, 2, 5.0, 20.0, 0.0).unwrap();
        // 不足 = 20 + 10 - 5 - 18 = 7 → ロット20 → 20
        seed_stock(&state, "W1", "I1", 5.0, 0.0, 18.0).unwrap();

        let (_snap, calc) = state.batch_api.run_all().unwrap();
        let candidates = state
            .approval_api
            .list_by_batch(&calc.batch_code.unwrap())
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].suggested_qty, 7.0);
        assert_eq!(candidates[0].order_qty, 20.0);
    }

    // ==========================================
    // 测试6: 快照缺失 = 结构性错误, 台账 FAILED, 不留候补
    // ==========================================

    #[test]
    fn test_missing_snapshot_aborts_run() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_two_tier_scenario(&state).unwrap();

        // 不生成快照直接计算
        let result = state.batch_api.run_calculation();
        assert!(matches!(result, Err(ApiError::StructuralConfig(_))),
                "快照缺失应按结构性错误处理");

        let job = state
            .job_repo
            .find_latest_by_process(PROCESS_REPLENISH_CALC)
            .unwrap()
            .expect("失败运行也应留台账");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.is_some());

        // 中止的运行不得留下部分候补
        let candidates = state
            .approval_api
            .list_by_batch(job.batch_code.as_deref().unwrap())
            .unwrap();
        assert!(candidates.is_empty());
    }

    // ==========================================
    // 测试7: 供给图循环 = 结构性错误中止
    // ==========================================

    #[test]
    fn test_cycle_aborts_run() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_supply_edge(&state, "W1", "I1", SupplyType::Internal, "W2", 0, 1, 1.0, 10.0, 0.0).unwrap();
        seed_supply_edge(&state, "W2", "I1", SupplyType::Internal, "W1", 1, 1, 1.0, 10.0, 0.0).unwrap();

        seed_stock(&state, "W1", "I1", 0.0, 0.0, 0.0).unwrap();
        seed_stock(&state, "W2", "I1", 0.0, 0.0, 0.0).unwrap();

        state.batch_api.run_snapshot().unwrap();

        let result = state.batch_api.run_calculation();
        assert!(matches!(result, Err(ApiError::StructuralConfig(_))));

        let job = state
            .job_repo
            .find_latest_by_process(PROCESS_REPLENISH_CALC)
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);

        let candidates = state
            .approval_api
            .list_by_batch(job.batch_code.as_deref().unwrap())
            .unwrap();
        assert!(candidates.is_empty(), "中止的运行不得留下部分候补");
    }

    // ==========================================
    // 测试8: 快照中缺单行 = 单点跳过, 运行整体成功
    // ==========================================

    #[test]
    fn test_missing_snapshot_row_skips_pair_only() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_supply_edge(&state, "W1", "I1", SupplyType::External, "C1", 0, 2, 5.0, 20.0, 0.0).unwrap();
        // W1×I2 有供给设定但没有库存行 → 快照缺行, 单点跳过
        seed_supply_edge(&state, "W1", "I2", SupplyType::External, "C1", 0, 2, 5.0, 20.0, 0.0).unwrap();

        seed_stock(&state, "W1", "I1", 0.0, 0.0, 0.0).unwrap();

        let (_snap, calc) = state.batch_api.run_all().unwrap();
        assert_eq!(calc.status, JobStatus::Success, "单点错误不应中止整个运行");

        let candidates = state
            .approval_api
            .list_by_batch(&calc.batch_code.unwrap())
            .unwrap();

        // 只有 I1 产出候补
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].item_id, "I1");
    }

    // ==========================================
    // 测试9: 无不足时产出零候补 (SUCCESS, 0件)
    // ==========================================

    #[test]
    fn test_no_shortage_produces_empty_batch() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_supply_edge(&state, "W1", "I1", SupplyType::External, "C1", 0, 2, 5.0, 20.0, 0.0).unwrap();
        seed_stock(&state, "W1", "I1", 500.0, 0.0, 0.0).unwrap();

        let (_snap, calc) = state.batch_api.run_all().unwrap();
        assert_eq!(calc.status, JobStatus::Success);
        assert_eq!(calc.processed_records, 0);
    }
}
