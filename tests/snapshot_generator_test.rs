// ==========================================
// 库存快照生成器测试
// ==========================================
// 职责: 验证快照的单一时刻/整套替换/台账记录语义
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod snapshot_generator_test {
    use crate::test_helpers::{seed_basic_masters, seed_stock, setup_test_state};
    use wms_replenish::domain::job::PROCESS_STOCK_SNAPSHOT;
    use wms_replenish::domain::master::Warehouse;
    use wms_replenish::domain::types::JobStatus;

    // ==========================================
    // 测试1: 单一 snapshot_at + available 计算
    // ==========================================

    #[test]
    fn test_snapshot_single_timestamp_and_available() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_stock(&state, "W1", "I1", 100.0, 30.0, 50.0).unwrap();
        seed_stock(&state, "W2", "I1", 10.0, 0.0, 0.0).unwrap();
        seed_stock(&state, "W3", "I2", 7.0, 2.0, 0.0).unwrap();

        let summary = state.batch_api.run_snapshot().unwrap();

        assert_eq!(summary.status, JobStatus::Success);
        assert_eq!(summary.processed_records, 3);

        let entries = state.snapshot_repo.find_all().unwrap();
        assert_eq!(entries.len(), 3);

        // 全部行共享同一个 snapshot_at
        let first_at = entries[0].snapshot_at;
        assert!(entries.iter().all(|e| e.snapshot_at == first_at),
                "同一次生成的快照行必须共享同一 snapshot_at");

        // available = on_hand - reserved
        let w1 = entries
            .iter()
            .find(|e| e.warehouse_id == "W1" && e.item_id == "I1")
            .unwrap();
        assert_eq!(w1.available_qty, 70.0);
        assert_eq!(w1.incoming_qty, 50.0);
    }

    // ==========================================
    // 测试2: 整套替换 (不合并旧快照)
    // ==========================================

    #[test]
    fn test_snapshot_replaces_previous_set() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_stock(&state, "W1", "I1", 100.0, 0.0, 0.0).unwrap();
        seed_stock(&state, "W2", "I1", 50.0, 0.0, 0.0).unwrap();
        state.batch_api.run_snapshot().unwrap();

        let first = state.snapshot_repo.find_all().unwrap();
        assert_eq!(first.len(), 2);
        let first_at = first[0].snapshot_at;

        // 库存变化后再生成: 旧快照整套替换
        seed_stock(&state, "W1", "I1", 80.0, 5.0, 0.0).unwrap();
        seed_stock(&state, "W3", "I1", 30.0, 0.0, 0.0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        state.batch_api.run_snapshot().unwrap();

        let second = state.snapshot_repo.find_all().unwrap();
        assert_eq!(second.len(), 3);

        let w1 = second
            .iter()
            .find(|e| e.warehouse_id == "W1" && e.item_id == "I1")
            .unwrap();
        assert_eq!(w1.on_hand_qty, 80.0);
        assert_eq!(w1.available_qty, 75.0);

        // snapshot_at 整体推进且全行一致, 不残留旧时刻
        let second_at = second[0].snapshot_at;
        assert!(second.iter().all(|e| e.snapshot_at == second_at));
        assert!(second_at > first_at);
    }

    // ==========================================
    // 测试3: 停用仓库不进入快照
    // ==========================================

    #[test]
    fn test_snapshot_excludes_inactive_warehouse() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();

        seed_stock(&state, "W1", "I1", 10.0, 0.0, 0.0).unwrap();
        seed_stock(&state, "W2", "I1", 20.0, 0.0, 0.0).unwrap();

        // W2 停用
        state
            .master_repo
            .upsert_warehouse(&Warehouse {
                warehouse_id: "W2".to_string(),
                warehouse_name: "仓库W2".to_string(),
                is_active: false,
            })
            .unwrap();

        let summary = state.batch_api.run_snapshot().unwrap();
        assert_eq!(summary.processed_records, 1);

        let entries = state.snapshot_repo.find_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].warehouse_id, "W1");
    }

    // ==========================================
    // 测试4: 台账记录
    // ==========================================

    #[test]
    fn test_snapshot_writes_job_control() {
        let (_temp_file, _db_path, state) = setup_test_state().unwrap();
        seed_basic_masters(&state).unwrap();
        seed_stock(&state, "W1", "I1", 10.0, 0.0, 0.0).unwrap();

        state.batch_api.run_snapshot().unwrap();

        let job = state
            .job_repo
            .find_latest_by_process(PROCESS_STOCK_SNAPSHOT)
            .unwrap()
            .expect("应存在快照台账行");

        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.processed_records, 1);
        assert!(job.started_at.is_some());
        assert!(job.ended_at.is_some());
        assert!(job.error_message.is_none());
    }
}
