// ==========================================
// 仓储运营后台 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod candidate_repo;
pub mod correction_repo;
pub mod error;
pub mod job_control_repo;
pub mod master_repo;
pub mod shortage_repo;
pub mod snapshot_repo;
pub mod stock_repo;
pub mod supply_repo;

// 重导出核心仓储
pub use candidate_repo::CandidateRepository;
pub use correction_repo::QuantityCorrectionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use job_control_repo::JobControlRepository;
pub use master_repo::MasterRepository;
pub use shortage_repo::ShortageRepository;
pub use snapshot_repo::StockSnapshotRepository;
pub use stock_repo::{DonorStock, LiveStockRow, WarehouseStockRepository};
pub use supply_repo::SupplySettingRepository;
