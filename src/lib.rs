// ==========================================
// 仓储运营后台 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 多级库存补货与缺货调拨引擎 (审批保留人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建库）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CandidateStatus, CandidateType, CorrectionStatus, JobStatus, LotFeeType, QuantityType,
    ShortageStatus, SupplyType,
};

// 领域实体
pub use domain::{
    Contractor, Item, JobControl, QuantityCorrection, ReplenishCandidate, Shortage,
    ShortageAllocation, StockSnapshotEntry, SupplyEdge, Warehouse, WarehouseRoute,
};

// 引擎
pub use engine::{
    AllocationOutcome, ApprovalEngine, CandidateEdit, EchelonCalculator, EngineError,
    MasterDataImporter, NamedLockManager, ShortageAllocator, SnapshotGenerator,
    SupplyGraphResolver,
};

// API
pub use api::{ApprovalApi, BatchJobApi, JobSummary, NewShortage, ShortageApi};

// 应用
pub use app::{get_default_db_path, AppState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓储运营后台 - 补货与横持引擎";
