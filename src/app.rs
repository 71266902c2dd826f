// ==========================================
// 仓储运营后台 - 应用装配
// ==========================================
// 职责: 打开数据库, 装配仓储/引擎/API (单连接 Arc<Mutex<Connection>> 共享)
// ==========================================

use crate::api::{ApprovalApi, BatchJobApi, ShortageApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::{
    ApprovalEngine, EchelonCalculator, MasterDataImporter, NamedLockManager, ShortageAllocator,
    SnapshotGenerator,
};
use crate::repository::{
    CandidateRepository, JobControlRepository, MasterRepository, QuantityCorrectionRepository,
    ShortageRepository, StockSnapshotRepository, SupplySettingRepository, WarehouseStockRepository,
};
use anyhow::Result;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 默认数据库路径 (系统数据目录下, 取不到时退回当前目录)
pub fn get_default_db_path() -> String {
    dirs::data_dir()
        .map(|dir| {
            dir.join("wms-replenish")
                .join("wms_replenish.db")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "wms_replenish.db".to_string())
}

// ==========================================
// AppState - 应用状态
// ==========================================
pub struct AppState {
    pub conn: Arc<Mutex<Connection>>,
    pub config_manager: Arc<ConfigManager>,

    // 仓储
    pub master_repo: Arc<MasterRepository>,
    pub stock_repo: Arc<WarehouseStockRepository>,
    pub supply_repo: Arc<SupplySettingRepository>,
    pub snapshot_repo: Arc<StockSnapshotRepository>,
    pub candidate_repo: Arc<CandidateRepository>,
    pub shortage_repo: Arc<ShortageRepository>,
    pub job_repo: Arc<JobControlRepository>,
    pub correction_repo: Arc<QuantityCorrectionRepository>,

    // 引擎/API
    pub lock_manager: NamedLockManager,
    pub importer: Arc<MasterDataImporter>,
    pub batch_api: Arc<BatchJobApi>,
    pub approval_api: Arc<ApprovalApi>,
    pub shortage_api: Arc<ShortageApi>,
}

impl AppState {
    /// 按数据库路径装配 (建库幂等)
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        if let Some(version) = read_schema_version(&conn)? {
            if version != CURRENT_SCHEMA_VERSION {
                warn!(
                    found = version,
                    expected = CURRENT_SCHEMA_VERSION,
                    "schema_version 与代码期望不一致"
                );
            }
        }

        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接装配
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self> {
        let config_manager = Arc::new(ConfigManager::new(conn.clone()));

        let master_repo = Arc::new(MasterRepository::new(conn.clone()));
        let stock_repo = Arc::new(WarehouseStockRepository::new(conn.clone()));
        let supply_repo = Arc::new(SupplySettingRepository::new(conn.clone()));
        let snapshot_repo = Arc::new(StockSnapshotRepository::new(conn.clone()));
        let candidate_repo = Arc::new(CandidateRepository::new(conn.clone()));
        let shortage_repo = Arc::new(ShortageRepository::new(conn.clone()));
        let job_repo = Arc::new(JobControlRepository::new(conn.clone()));
        let correction_repo = Arc::new(QuantityCorrectionRepository::new(conn.clone()));

        let lock_manager = NamedLockManager::new();

        let snapshot_generator = Arc::new(SnapshotGenerator::new(
            stock_repo.clone(),
            snapshot_repo.clone(),
            job_repo.clone(),
        ));

        let calculator = Arc::new(EchelonCalculator::new(
            snapshot_repo.clone(),
            supply_repo.clone(),
            candidate_repo.clone(),
            master_repo.clone(),
            job_repo.clone(),
            config_manager.clone(),
        ));

        let approval_engine = Arc::new(ApprovalEngine::new(candidate_repo.clone()));

        let allocator = Arc::new(ShortageAllocator::new(
            shortage_repo.clone(),
            stock_repo.clone(),
            correction_repo.clone(),
            lock_manager.clone(),
            config_manager.clone(),
        ));

        let importer = Arc::new(MasterDataImporter::new(
            supply_repo.clone(),
            stock_repo.clone(),
        ));

        let batch_api = Arc::new(BatchJobApi::new(
            snapshot_generator,
            calculator,
            lock_manager.clone(),
        ));
        let approval_api = Arc::new(ApprovalApi::new(approval_engine, candidate_repo.clone()));
        let shortage_api = Arc::new(ShortageApi::new(
            allocator,
            shortage_repo.clone(),
            correction_repo.clone(),
        ));

        Ok(Self {
            conn,
            config_manager,
            master_repo,
            stock_repo,
            supply_repo,
            snapshot_repo,
            candidate_repo,
            shortage_repo,
            job_repo,
            correction_repo,
            lock_manager,
            importer,
            batch_api,
            approval_api,
            shortage_api,
        })
    }
}
