// ==========================================
// 仓储运营后台 - API 层
// ==========================================
// 职责: 面向管理画面/CLI/外部协作方的业务接口
// ==========================================

pub mod approval_api;
pub mod batch_api;
pub mod error;
pub mod shortage_api;

pub use approval_api::ApprovalApi;
pub use batch_api::{BatchJobApi, JobSummary};
pub use error::{ApiError, ApiResult};
pub use shortage_api::{NewShortage, ShortageApi};
