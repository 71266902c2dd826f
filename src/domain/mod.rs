// ==========================================
// 仓储运营后台 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod candidate;
pub mod job;
pub mod master;
pub mod shortage;
pub mod snapshot;
pub mod supply;
pub mod types;

// 重导出核心类型
pub use candidate::ReplenishCandidate;
pub use job::{JobControl, PROCESS_REPLENISH_CALC, PROCESS_STOCK_SNAPSHOT};
pub use master::{Contractor, Item, Warehouse, WarehouseRoute};
pub use shortage::{QuantityCorrection, Shortage, ShortageAllocation};
pub use snapshot::StockSnapshotEntry;
pub use supply::SupplyEdge;
pub use types::{
    CandidateStatus, CandidateType, CorrectionStatus, JobStatus, LotFeeType, QuantityType,
    ShortageStatus, SupplyType,
};
