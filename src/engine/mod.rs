// ==========================================
// 仓储运营后台 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 错误必须带可解释的原因
// ==========================================

pub mod approval;
pub mod echelon_calculator;
pub mod error;
pub mod importer;
pub mod lock_manager;
pub mod lot_strategy;
pub mod shortage_allocator;
pub mod snapshot_generator;
pub mod supply_graph;

// 重导出核心引擎
pub use approval::{ApprovalEngine, CandidateEdit};
pub use echelon_calculator::EchelonCalculator;
pub use error::{EngineError, EngineResult};
pub use importer::{ImportReport, ImportRowError, MasterDataImporter};
pub use lock_manager::{NamedLockGuard, NamedLockManager};
pub use lot_strategy::{LotAdjustment, LotFeeStrategy};
pub use shortage_allocator::{AllocationOutcome, ShortageAllocator};
pub use snapshot_generator::SnapshotGenerator;
pub use supply_graph::SupplyGraphResolver;
